//! Configuration access port trait.
//!
//! Keys are addressed as `[section] key`. Getters with a `default` return it
//! for missing or unparsable values; range checks live in
//! `domain::config_validation`.

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_double(&self, section: &str, key: &str, default: f64) -> f64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;

    /// Integer key read as a count. Negative values fall back to `default`.
    fn get_count(&self, section: &str, key: &str, default: usize) -> usize {
        let value = self.get_int(section, key, default as i64);
        usize::try_from(value).unwrap_or(default)
    }
}
