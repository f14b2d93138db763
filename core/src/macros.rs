//! Macros for wrapped byte-vector and marked-digest newtypes.

/// Implement a newtype wrapping a `Vec<u8>` that serializes with a
/// `CompactSize` length prefix. Used for scripts and witness stack items,
/// which this workspace treats as opaque bytes with no semantics.
#[macro_export]
macro_rules! wrap_prefixed_byte_vector {
    (
        $(#[$outer:meta])*
        $name:ident
    ) => {
        $(#[$outer])*
        #[derive(Clone, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub(crate) Vec<u8>);

        impl $name {
            /// Instantiate a new wrapped vector from raw bytes.
            pub fn new(v: Vec<u8>) -> Self {
                Self(v)
            }

            /// The empty wrapped vector, which serializes as a single 0 byte.
            pub fn null() -> Self {
                Self(vec![])
            }

            /// The number of underlying bytes (excluding the length prefix).
            pub fn len(&self) -> usize {
                self.0.len()
            }

            /// True if the underlying vector is empty.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// A view of the underlying bytes.
            pub fn items(&self) -> &[u8] {
                &self.0
            }
        }

        impl From<Vec<u8>> for $name {
            fn from(v: Vec<u8>) -> Self {
                Self(v)
            }
        }

        impl From<&[u8]> for $name {
            fn from(v: &[u8]) -> Self {
                Self(v.to_vec())
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl $crate::ser::ByteFormat for $name {
            type Error = $crate::ser::SerError;

            fn serialized_length(&self) -> usize {
                $crate::ser::prefix_byte_len(self.0.len() as u64) + self.0.len()
            }

            fn read_from<R: std::io::Read>(reader: &mut R) -> Result<Self, Self::Error> {
                let count = $crate::ser::read_compact_int(reader)?;
                Ok(Self($crate::ser::read_exact_vec(reader, count as usize)?))
            }

            fn write_to<W: std::io::Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
                let mut len = $crate::ser::write_compact_int(writer, self.0.len() as u64)?;
                writer.write_all(&self.0)?;
                len += self.0.len();
                Ok(len)
            }
        }
    };
}

/// Implement `From` conversions between two wrapped byte-vector types. This
/// merely rewraps the underlying `Vec<u8>`.
#[macro_export]
macro_rules! impl_script_conversion {
    ($t1:ty, $t2:ty) => {
        impl From<&$t2> for $t1 {
            fn from(t: &$t2) -> $t1 {
                <$t1>::new(t.items().to_vec())
            }
        }
        impl From<&$t1> for $t2 {
            fn from(t: &$t1) -> $t2 {
                <$t2>::new(t.items().to_vec())
            }
        }
    };
}

/// Implement a marked 32-byte digest newtype (TXID, WTXID, ...).
#[macro_export]
macro_rules! mark_hash256 {
    (
        $(#[$outer:meta])*
        $name:ident
    ) => {
        $(#[$outer])*
        #[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
        pub struct $name(pub $crate::hashes::Hash256Digest);

        impl $crate::hashes::MarkedDigest for $name {
            fn from_digest(digest: $crate::hashes::Hash256Digest) -> Self {
                Self(digest)
            }

            fn internal(&self) -> $crate::hashes::Hash256Digest {
                self.0
            }
        }

        impl From<$crate::hashes::Hash256Digest> for $name {
            fn from(digest: $crate::hashes::Hash256Digest) -> Self {
                Self(digest)
            }
        }

        impl From<$name> for $crate::hashes::Hash256Digest {
            fn from(marked: $name) -> Self {
                marked.0
            }
        }

        impl AsRef<[u8]> for $name {
            fn as_ref(&self) -> &[u8] {
                &self.0
            }
        }

        impl $name {
            /// Render in the display byte order (big-endian, as block
            /// explorers print txids).
            pub fn to_be_hex(&self) -> String {
                let mut digest = self.0;
                digest.reverse();
                $crate::hex::encode(digest)
            }

            /// Parse from display byte order.
            pub fn from_be_hex(hex_str: &str) -> Result<Self, $crate::ser::SerError> {
                let mut digest =
                    <Self as $crate::ser::ByteFormat>::deserialize_hex(hex_str)?.0;
                digest.reverse();
                Ok(Self(digest))
            }
        }

        impl $crate::ser::ByteFormat for $name {
            type Error = $crate::ser::SerError;

            fn serialized_length(&self) -> usize {
                32
            }

            fn read_from<R: std::io::Read>(reader: &mut R) -> Result<Self, Self::Error> {
                let mut digest = $crate::hashes::Hash256Digest::default();
                reader.read_exact(&mut digest)?;
                Ok(Self(digest))
            }

            fn write_to<W: std::io::Write>(&self, writer: &mut W) -> Result<usize, Self::Error> {
                writer.write_all(&self.0)?;
                Ok(32)
            }
        }
    };
}
