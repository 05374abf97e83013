//! Sensitive-data interception
//!
//! Stateless scanner/redactor for structured sensitive data in outbound
//! agent requests:
//! - Credit card numbers, SSNs, email addresses, phone numbers (redacted)
//! - Money transfer instructions (hard block)
//!
//! ```text
//! text → detect() → [Finding...]
//!          │
//!          ├─ any Transfer → blocked, nothing redacted
//!          └─ otherwise    → redact() → forwarded text
//! ```

mod classifier;
mod types;

pub use classifier::{Interceptor, TRANSFER_BLOCK_REASON};
pub use types::{Finding, FindingKind, ScreenResult};
