//! Configuration access port.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Parsed float, or `default` when the key is missing or not a number.
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;

    /// All `(key, value)` pairs of a section, sorted by key. Empty when the
    /// section is missing.
    fn entries(&self, section: &str) -> Vec<(String, String)>;

    /// Names of all sections.
    fn sections(&self) -> Vec<String>;
}
