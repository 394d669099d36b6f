//! Position payload normalization and fetch client.
//!
//! The upstream representation is undocumented and unstable; this crate
//! turns whatever arrives (a JSON API envelope, a bare entry list, or a
//! pasted DOM dump) into canonical `Position` records or a classified
//! failure. The envelope shape is decided exactly once at the top of
//! normalization, never by ad hoc field probing at call sites.

pub mod client;
pub mod envelope;
pub mod error;
pub mod markup;
pub mod normalize;

pub use client::{LeaderboardClient, PositionSource, DEFAULT_API_URL};
pub use envelope::Envelope;
pub use error::{SourceError, SourceResult};
pub use markup::{MarkupNode, MarkupProfile, RawMarkupEntry};
pub use normalize::{normalize, normalize_document, normalize_markup, scrub_decimal};
