use std::{collections::HashMap, str::FromStr};

use super::error::TypeError;

pub type QueryData = HashMap<String, String>;

/// Typed access to the query string of a request
pub struct Form {
    inner: QueryData,
}

impl Form {
    pub fn from_data(data: QueryData) -> Self {
        Self { inner: data }
    }

    /// Missing or empty keys read as `None`, unparsable values are an error
    pub fn get_number<T>(&self, key: &str) -> Result<Option<T>, TypeError>
    where
        T: FromStr,
    {
        match self.get_str(key) {
            Some(value) => value
                .parse()
                .map(Some)
                .map_err(|_e| TypeError::new(&format!("Invalid value for '{key}'"))),
            None => Ok(None),
        }
    }

    /// `0`/`1` flags, `true`/`false` are accepted as well
    pub fn get_flag(&self, key: &str) -> Result<Option<bool>, TypeError> {
        match self.get_str(key) {
            Some("1") | Some("true") => Ok(Some(true)),
            Some("0") | Some("false") => Ok(Some(false)),
            Some(_) => Err(TypeError::new(&format!("Invalid value for '{key}'"))),
            None => Ok(None),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.inner
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(pairs: &[(&str, &str)]) -> Form {
        Form::from_data(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn reads_numbers_and_flags() {
        let form = form(&[("author", "12"), ("is_favorited", "1"), ("is_in_shopping_cart", "0")]);

        assert_eq!(form.get_number::<i32>("author").unwrap(), Some(12));
        assert_eq!(form.get_flag("is_favorited").unwrap(), Some(true));
        assert_eq!(form.get_flag("is_in_shopping_cart").unwrap(), Some(false));
        assert_eq!(form.get_flag("missing").unwrap(), None);
    }

    #[test]
    fn rejects_garbage() {
        let form = form(&[("author", "abc"), ("is_favorited", "yes")]);

        assert!(form.get_number::<i32>("author").is_err());
        assert!(form.get_flag("is_favorited").is_err());
    }

    #[test]
    fn blank_values_are_absent() {
        let form = form(&[("tags", "  ")]);

        assert_eq!(form.get_str("tags"), None);
    }
}
