//! CSI parameter handling
//!
//! Parameters are separated by `;`. A parameter may carry colon-separated
//! sub-parameters (`38:2:255:0:0`), which are kept so that SGR can tell
//! the colon forms from the legacy semicolon forms.

/// Maximum number of parameters kept; extra parameters are ignored
pub const MAX_PARAMS: usize = 16;

/// Maximum number of sub-parameters kept per parameter
pub const MAX_SUBPARAMS: usize = 8;

/// Values saturate at this bound
pub const MAX_PARAM_VALUE: i64 = i32::MAX as i64;

/// One `;`-separated parameter with its `:`-separated sub-parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Param {
    value: Option<i64>,
    subparams: Vec<Option<i64>>,
}

impl Param {
    /// The parameter value, `None` when omitted
    pub fn value(&self) -> Option<i64> {
        self.value
    }

    /// Sub-parameters following the value
    pub fn subparams(&self) -> &[Option<i64>] {
        &self.subparams
    }

    pub fn has_subparams(&self) -> bool {
        !self.subparams.is_empty()
    }
}

/// Parsed CSI parameters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Params {
    params: Vec<Param>,
}

impl Params {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse parameter bytes (digits, `;` and `:`)
    pub fn parse(bytes: &[u8]) -> Self {
        let mut params = Vec::new();
        if bytes.is_empty() {
            return Self { params };
        }

        for group in bytes.split(|&b| b == b';') {
            if params.len() >= MAX_PARAMS {
                break;
            }
            let mut pieces = group.split(|&b| b == b':');
            let value = pieces.next().and_then(parse_number);
            let subparams = pieces.take(MAX_SUBPARAMS).map(parse_number).collect();
            params.push(Param { value, subparams });
        }

        Self { params }
    }

    /// Build parameters from plain values (no omitted slots)
    pub fn from_values(values: &[i64]) -> Self {
        Self {
            params: values
                .iter()
                .take(MAX_PARAMS)
                .map(|&v| Param {
                    value: Some(v.clamp(0, MAX_PARAM_VALUE)),
                    subparams: Vec::new(),
                })
                .collect(),
        }
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Raw value at `index`, `None` if omitted or absent
    pub fn get(&self, index: usize) -> Option<i64> {
        self.params.get(index).and_then(|p| p.value)
    }

    /// Count-style parameter: omitted or zero means `default`
    pub fn param(&self, index: usize, default: i64) -> i64 {
        match self.get(index) {
            None | Some(0) => default,
            Some(v) => v,
        }
    }

    /// Mode-style parameter: omitted means `default`, zero is kept
    pub fn value_or(&self, index: usize, default: i64) -> i64 {
        self.get(index).unwrap_or(default)
    }

    /// Full parameter (value plus sub-parameters) at `index`
    pub fn slot(&self, index: usize) -> Option<&Param> {
        self.params.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Param> {
        self.params.iter()
    }
}

fn parse_number(digits: &[u8]) -> Option<i64> {
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            continue;
        }
        value = value
            .saturating_mul(10)
            .saturating_add((b - b'0') as i64)
            .min(MAX_PARAM_VALUE);
    }
    Some(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_params_parse_simple() {
        let params = Params::parse(b"1;2;3");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), Some(1));
        assert_eq!(params.get(2), Some(3));
    }

    #[test]
    fn test_params_parse_omitted() {
        let params = Params::parse(b";5;");
        assert_eq!(params.len(), 3);
        assert_eq!(params.get(0), None);
        assert_eq!(params.get(1), Some(5));
        assert_eq!(params.get(2), None);
    }

    #[test]
    fn test_params_empty() {
        assert!(Params::parse(b"").is_empty());
    }

    #[test]
    fn test_params_param_defaults() {
        let params = Params::parse(b"0;7");
        assert_eq!(params.param(0, 1), 1);
        assert_eq!(params.value_or(0, 1), 0);
        assert_eq!(params.param(1, 1), 7);
        assert_eq!(params.param(5, 1), 1);
    }

    #[test]
    fn test_params_subparams() {
        let params = Params::parse(b"38:2::255:128:0;1");
        assert_eq!(params.len(), 2);
        let slot = params.slot(0).unwrap();
        assert_eq!(slot.value(), Some(38));
        assert_eq!(slot.subparams(), &[Some(2), None, Some(255), Some(128), Some(0)]);
        assert!(!params.slot(1).unwrap().has_subparams());
    }

    #[test]
    fn test_params_saturate() {
        let params = Params::parse(b"99999999999999999999");
        assert_eq!(params.get(0), Some(MAX_PARAM_VALUE));
    }

    #[test]
    fn test_params_max_count() {
        let input = vec!["1"; 40].join(";");
        let params = Params::parse(input.as_bytes());
        assert_eq!(params.len(), MAX_PARAMS);
    }
}
