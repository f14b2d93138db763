//! BIP32 derivation paths.

use std::str::FromStr;

use crate::xkeys::DerivationError;

/// The BIP32 hardening bit. Indices at or above this require a private
/// parent to derive.
pub const BIP32_HARDEN: u32 = 0x8000_0000;

/// A parsed derivation path: a list of child indices, hardened indices
/// carrying the high bit. Parses from the conventional string form, e.g.
/// `m/44'/0'/0'/0/0` (both `'` and `h` mark hardening).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct DerivationPath(Vec<u32>);

impl DerivationPath {
    /// Build a path from raw indices.
    pub fn new(indices: Vec<u32>) -> Self {
        Self(indices)
    }

    /// True if the path has no components.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the child indices in derivation order.
    pub fn iter(&self) -> impl Iterator<Item = &u32> {
        self.0.iter()
    }

    /// True if any component is hardened.
    pub fn has_hardened(&self) -> bool {
        self.0.iter().any(|i| *i >= BIP32_HARDEN)
    }
}

impl From<Vec<u32>> for DerivationPath {
    fn from(indices: Vec<u32>) -> Self {
        Self(indices)
    }
}

impl FromStr for DerivationPath {
    type Err = DerivationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut indices = vec![];
        for (position, component) in s.split('/').enumerate() {
            if position == 0 && (component == "m" || component == "M") {
                continue;
            }
            let (digits, hardened) =
                if let Some(stripped) =
                    component.strip_suffix(|c| c == '\'' || c == 'h' || c == 'H')
                {
                    (stripped, true)
                } else {
                    (component, false)
                };
            let index: u32 = digits
                .parse()
                .map_err(|_| DerivationError::MalformedPath(component.to_owned()))?;
            if index >= BIP32_HARDEN {
                return Err(DerivationError::MalformedPath(component.to_owned()));
            }
            indices.push(if hardened { index | BIP32_HARDEN } else { index });
        }
        Ok(Self(indices))
    }
}

impl std::fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m")?;
        for index in &self.0 {
            if *index >= BIP32_HARDEN {
                write!(f, "/{}'", index & !BIP32_HARDEN)?;
            } else {
                write!(f, "/{}", index)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn it_parses_and_displays_paths() {
        let path: DerivationPath = "m/44'/0'/0'/0/5".parse().unwrap();
        assert_eq!(
            path,
            DerivationPath::new(vec![
                44 | BIP32_HARDEN,
                BIP32_HARDEN,
                BIP32_HARDEN,
                0,
                5
            ])
        );
        assert!(path.has_hardened());
        assert_eq!(path.to_string(), "m/44'/0'/0'/0/5");

        let h_form: DerivationPath = "m/44h/1h".parse().unwrap();
        assert_eq!(
            h_form,
            DerivationPath::new(vec![44 | BIP32_HARDEN, 1 | BIP32_HARDEN])
        );
    }

    #[test]
    fn it_rejects_junk_components() {
        assert!("m/44'/x".parse::<DerivationPath>().is_err());
        assert!("m/2147483648".parse::<DerivationPath>().is_err());
    }
}
