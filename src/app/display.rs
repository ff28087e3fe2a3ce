/// Sink for the currently active lyric line.
///
/// Overlay windows are collaborators outside this crate; they implement this
/// and receive one call per line change (redundant calls are suppressed
/// upstream). An empty string clears the display.
pub trait Display {
    fn set_lyrics(&mut self, text: &str);
}

/// Prints each line change to stdout (headless).
#[derive(Debug, Default)]
pub struct StdoutDisplay;

impl StdoutDisplay {
    pub fn new() -> Self {
        Self
    }
}

impl Display for StdoutDisplay {
    fn set_lyrics(&mut self, text: &str) {
        println!("{text}");
    }
}
