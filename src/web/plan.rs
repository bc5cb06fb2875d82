use std::fmt;

/// How a handler wants its arguments sourced from a request.
///
/// Declared once next to the handler and treated as immutable route
/// configuration by the adapter.
///
/// ```
/// use awesome_blog::web::ParameterPlan;
///
/// let plan = ParameterPlan::new()
///     .request()
///     .required("name")
///     .keyword("page");
/// assert!(plan.needs_keywords());
/// assert!(plan.is_required("name"));
/// assert!(!plan.is_required("page"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterPlan {
    accepts_request: bool,
    accepts_var_keyword: bool,
    named: Vec<String>,
    required: Vec<String>,
}

impl ParameterPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pass the request context to the handler.
    pub fn request(mut self) -> Self {
        self.accepts_request = true;
        self
    }

    /// Accept every keyword the request carries, not only the named ones.
    pub fn var_keyword(mut self) -> Self {
        self.accepts_var_keyword = true;
        self
    }

    /// Optional named keyword argument.
    pub fn keyword(mut self, name: &str) -> Self {
        self.add_named(name);
        self
    }

    /// Named keyword argument that must be present.
    pub fn required(mut self, name: &str) -> Self {
        self.add_named(name);
        if !self.required.iter().any(|n| n == name) {
            self.required.push(name.to_string());
        }
        self
    }

    fn add_named(&mut self, name: &str) {
        if !self.named.iter().any(|n| n == name) {
            self.named.push(name.to_string());
        }
    }

    pub fn accepts_request(&self) -> bool {
        self.accepts_request
    }

    pub fn accepts_var_keyword(&self) -> bool {
        self.accepts_var_keyword
    }

    /// All named keyword arguments, required ones included, in declaration order.
    pub fn named_keywords(&self) -> &[String] {
        &self.named
    }

    pub fn required_keywords(&self) -> &[String] {
        &self.required
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.named.iter().any(|n| n == name)
    }

    pub fn is_required(&self, name: &str) -> bool {
        self.required.iter().any(|n| n == name)
    }

    /// Whether the body or query string has to be read at all.
    pub fn needs_keywords(&self) -> bool {
        self.accepts_var_keyword || !self.named.is_empty() || !self.required.is_empty()
    }
}

impl fmt::Display for ParameterPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut params = Vec::new();
        if self.accepts_request {
            params.push("request".to_string());
        }
        for name in &self.named {
            if self.is_required(name) {
                params.push(name.clone());
            } else {
                params.push(format!("{name}=?"));
            }
        }
        if self.accepts_var_keyword {
            params.push("**kw".to_string());
        }
        write!(f, "{}", params.join(", "))
    }
}
