// ─── Credentials ───
// Content identity keys (CIK) decrypt GDK packages. They arrive as the opaque
// `CIK_DATA` blob and are only ever handed out through `Authenticator`.

pub mod blob;
pub mod extractor;

pub use blob::{Authenticator, Channel, ContentKey, ContentKeys, CIK_ENV};
pub use extractor::CikExtractor;
