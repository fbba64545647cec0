//! Call signatures.
//!
//! A signature is a short string of type codes: the first character is the return type, the
//! rest are the parameter types. `"vi"` is a function taking one `i32` and returning nothing,
//! `"dij"` returns a double and takes an `i32` and a 64-bit integer.
//!
//! The arity of a signature is its full length, so a call through signature `s` carries
//! `s.arity() - 1` arguments.

use std::{fmt, str::FromStr};

use crate::{
    value::{HostValue, ValueKind},
    Error, Result,
};

/// A parsed call signature.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Signature {
    text: String,
    ret: ValueKind,
    params: Vec<ValueKind>,
}

impl Signature {
    /// Parses a signature string.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidSignature`] if the string is empty, contains an unknown type
    /// code, or uses `v` as a parameter type.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use memrt::dispatch::Signature;
    ///
    /// let sig = Signature::parse("iid")?;
    /// assert_eq!(sig.arity(), 3);
    /// assert_eq!(sig.params().len(), 2);
    /// assert!(Signature::parse("ix").is_err());
    /// # Ok::<(), memrt::Error>(())
    /// ```
    pub fn parse(text: &str) -> Result<Self> {
        let mut codes = text.chars().map(ValueKind::from_code);
        let ret = codes
            .next()
            .flatten()
            .ok_or_else(|| Error::InvalidSignature(text.to_string()))?;

        let params = codes
            .map(|kind| match kind {
                Some(ValueKind::Void) | None => Err(Error::InvalidSignature(text.to_string())),
                Some(kind) => Ok(kind),
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Signature {
            text: text.to_string(),
            ret,
            params,
        })
    }

    /// The signature string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Return type.
    #[must_use]
    pub fn ret(&self) -> ValueKind {
        self.ret
    }

    /// Parameter types.
    #[must_use]
    pub fn params(&self) -> &[ValueKind] {
        &self.params
    }

    /// Length of the signature: return type plus parameters.
    #[must_use]
    pub fn arity(&self) -> usize {
        self.params.len() + 1
    }

    /// Checks that `args` has the number of arguments this signature expects.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArityMismatch`] otherwise.
    pub fn check_args(&self, args: &[HostValue]) -> Result<()> {
        let expected = self.arity() - 1;
        if args.len() != expected {
            return Err(Error::ArityMismatch {
                signature: self.text.clone(),
                expected,
                found: args.len(),
            });
        }
        Ok(())
    }
}

impl FromStr for Signature {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Signature::parse(s)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse() {
        let sig = Signature::parse("vij").unwrap();
        assert_eq!(sig.ret(), ValueKind::Void);
        assert_eq!(sig.params(), &[ValueKind::I32, ValueKind::I64]);
        assert_eq!(sig.arity(), 3);
        assert_eq!(sig.to_string(), "vij");

        let unit: Signature = "v".parse().unwrap();
        assert_eq!(unit.arity(), 1);
        assert!(unit.params().is_empty());
    }

    #[test]
    fn test_parse_invalid() {
        for text in ["", "x", "iq", "ivi"] {
            assert!(
                matches!(Signature::parse(text), Err(Error::InvalidSignature(_))),
                "{text}"
            );
        }
    }

    #[test]
    fn test_check_args() {
        let sig = Signature::parse("iii").unwrap();
        assert!(sig.check_args(&[HostValue::I32(1), HostValue::I32(2)]).is_ok());
        match sig.check_args(&[HostValue::I32(1)]) {
            Err(Error::ArityMismatch {
                signature,
                expected,
                found,
            }) => {
                assert_eq!(signature, "iii");
                assert_eq!(expected, 2);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
