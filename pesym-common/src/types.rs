//! Common types and errors used in `pesym`.

use std::fmt;
use std::str;

/// An error returned for an invalid [`Arch`](enum.Arch.html).
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct UnknownArchError;

impl fmt::Display for UnknownArchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown architecture")
    }
}

impl std::error::Error for UnknownArchError {}

/// The CPU architecture a Windows image was built for.
///
/// Only the four machine types that carry PDB information in practice are distinguished; every other
/// COFF machine value maps to [`Arch::Unknown`]. Since the architecture is informational, an unknown
/// machine is never treated as an error.
///
/// This enumeration is represented as `u32`. The numeric values are part of the upload protocol and
/// must not be changed.
#[repr(u32)]
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Arch {
    /// Any machine type that is not explicitly supported.
    #[default]
    Unknown = 0,
    /// 32-bit Intel, `IMAGE_FILE_MACHINE_I386`.
    X86 = 1,
    /// 64-bit Intel and AMD, `IMAGE_FILE_MACHINE_AMD64`.
    X64 = 2,
    /// 32-bit ARM Thumb-2, `IMAGE_FILE_MACHINE_ARMNT`.
    Arm32 = 3,
    /// 64-bit ARM, `IMAGE_FILE_MACHINE_ARM64`.
    Arm64 = 4,
}

impl Arch {
    /// Creates an `Arch` from its `u32` representation.
    ///
    /// Returns `Arch::Unknown` for all values that do not name an architecture.
    ///
    /// # Examples
    ///
    /// ```
    /// use pesym_common::Arch;
    ///
    /// assert_eq!(Arch::from_u32(2), Arch::X64);
    /// assert_eq!(Arch::from_u32(42), Arch::Unknown);
    /// ```
    pub fn from_u32(value: u32) -> Arch {
        match value {
            1 => Arch::X86,
            2 => Arch::X64,
            3 => Arch::Arm32,
            4 => Arch::Arm64,
            _ => Arch::Unknown,
        }
    }

    /// Returns the name of the architecture as used by the symbol upload service.
    ///
    /// # Examples
    ///
    /// ```
    /// use pesym_common::Arch;
    ///
    /// assert_eq!(Arch::Arm64.name(), "arm64");
    /// ```
    pub fn name(self) -> &'static str {
        match self {
            Arch::Unknown => "unknown",
            Arch::X86 => "x86",
            Arch::X64 => "x64",
            Arch::Arm32 => "arm32",
            Arch::Arm64 => "arm64",
        }
    }

    /// Returns whether the architecture is well-known.
    pub fn well_known(self) -> bool {
        self != Arch::Unknown
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl str::FromStr for Arch {
    type Err = UnknownArchError;

    fn from_str(string: &str) -> Result<Arch, UnknownArchError> {
        Ok(match string.to_ascii_lowercase().as_str() {
            "unknown" => Arch::Unknown,
            // breakpad writes `x86` for 32-bit windows modules
            "x86" | "i386" => Arch::X86,
            "x64" | "x86_64" | "amd64" => Arch::X64,
            "arm32" | "arm" | "armv7" => Arch::Arm32,
            "arm64" => Arch::Arm64,
            _ => return Err(UnknownArchError),
        })
    }
}

/// An error returned when parsing a [`BuildId`](struct.BuildId.html) from a string.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ParseBuildIdError;

impl fmt::Display for ParseBuildIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid build id")
    }
}

impl std::error::Error for ParseBuildIdError {}

/// The identity of a PDB, used to deduplicate symbol uploads.
///
/// A build id is the canonical GUID signature of the PDB followed by an underscore and its decimal
/// age, for example `E37085B2-4E2C-4BF4-B83F-84F16BC71B74_1`. Files without PDB information all share
/// the sentinel id `?_?`.
///
/// The string form is used as an idempotency key by the ingestion service and is therefore stable:
/// same GUID formatting, same separator and same sentinel.
#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct BuildId(String);

impl BuildId {
    /// The string form of [`BuildId::unknown`].
    pub const UNKNOWN: &'static str = "?_?";

    /// Creates a build id from a formatted PDB signature and an age.
    ///
    /// # Examples
    ///
    /// ```
    /// use pesym_common::BuildId;
    ///
    /// let id = BuildId::new("E37085B2-4E2C-4BF4-B83F-84F16BC71B74", 1);
    /// assert_eq!(id.to_string(), "E37085B2-4E2C-4BF4-B83F-84F16BC71B74_1");
    /// ```
    pub fn new(signature: &str, age: u32) -> Self {
        BuildId(format!("{signature}_{age}"))
    }

    /// Returns the sentinel id shared by all files without PDB information.
    pub fn unknown() -> Self {
        BuildId(Self::UNKNOWN.to_owned())
    }

    /// Returns `true` if this is the sentinel id.
    pub fn is_unknown(&self) -> bool {
        self.0 == Self::UNKNOWN
    }

    /// Returns the wire representation of this id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BuildId {
    fn default() -> Self {
        Self::unknown()
    }
}

impl fmt::Display for BuildId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl str::FromStr for BuildId {
    type Err = ParseBuildIdError;

    fn from_str(string: &str) -> Result<BuildId, ParseBuildIdError> {
        if string == Self::UNKNOWN {
            return Ok(Self::unknown());
        }

        let (signature, age) = string.rsplit_once('_').ok_or(ParseBuildIdError)?;
        if signature.is_empty() {
            return Err(ParseBuildIdError);
        }
        let age = age.parse::<u32>().map_err(|_| ParseBuildIdError)?;
        Ok(BuildId::new(signature, age))
    }
}

#[cfg(feature = "serde")]
mod derive_serde {
    /// Helper macro to implement string based serialization and deserialization.
    ///
    /// If a type implements `FromStr` and exposes its string form, this implements a
    /// serializer/deserializer for that type that dispatches appropriately.
    macro_rules! impl_str_serde {
        ($type:ty, $as_str:ident) => {
            impl ::serde_::ser::Serialize for $type {
                fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
                where
                    S: ::serde_::ser::Serializer,
                {
                    serializer.serialize_str(self.$as_str())
                }
            }

            impl<'de> ::serde_::de::Deserialize<'de> for $type {
                fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
                where
                    D: ::serde_::de::Deserializer<'de>,
                {
                    <::std::borrow::Cow<str>>::deserialize(deserializer)?
                        .parse()
                        .map_err(::serde_::de::Error::custom)
                }
            }
        };
    }

    impl_str_serde!(super::Arch, name);
    impl_str_serde!(super::BuildId, as_str);
}
