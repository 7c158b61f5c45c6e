//! ClientHello template model and its three construction paths: JA3 string,
//! JSON descriptor, named browser profile.

pub mod builder;
pub mod descriptor;
pub mod model;

pub use builder::{from_ja3, from_profile, HelloInput, SpecSource};
pub use descriptor::Descriptor;
pub use model::{
    ClientHelloSpec, ExtensionSpec, KeyMaterial, KeyShareEntry, PaddingStyle, RenegotiationMode,
};
