use crate::PathParams;
use regex::Regex;

/// A route path compiled into an anchored regular expression.
///
/// Every `:name` segment becomes a `([^/]+)` capture, literal segments are escaped, and a
/// single optional trailing slash is accepted: `/users/:id` compiles to `^/users/([^/]+)/?$`.
#[derive(Debug, Clone)]
pub struct PathPattern {
    regex: Regex,
    param_names: Vec<String>,
}

impl PathPattern {
    /// Compiles `path`, the root path `/` has no pattern and only matches literally.
    pub fn compile(path: &str) -> Result<Option<Self>, regex::Error> {
        if path == "/" {
            return Ok(None);
        }

        let mut pattern = String::with_capacity(path.len() + 8);
        pattern.push('^');
        let mut param_names = Vec::new();

        for segment in path.split('/').filter(|segment| !segment.is_empty()) {
            match segment.strip_prefix(':') {
                Some(name) if !name.is_empty() => {
                    pattern.push_str("/([^/]+)");
                    param_names.push(name.to_string());
                }
                _ => {
                    pattern.push('/');
                    pattern.push_str(&regex::escape(segment));
                }
            }
        }

        pattern.push_str("/?$");
        let regex = Regex::new(&pattern)?;

        Ok(Some(Self { regex, param_names }))
    }

    /// Tests `path`, returning the captured parameters on success.
    pub fn matches(&self, path: &str) -> Option<PathParams> {
        let captures = self.regex.captures(path)?;
        let params = self
            .param_names
            .iter()
            .zip(captures.iter().skip(1))
            .filter_map(|(name, value)| value.map(|value| (name.clone(), value.as_str().to_string())))
            .collect();
        Some(params)
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }
}
