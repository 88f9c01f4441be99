//! `homeprint-escpos`
//!
//! **Responsibility:** the device protocol for line-oriented thermal receipt printers.
//!
//! - [`command`]: the control-operation stream shared by encoder and decoder, and its
//!   lowering to ESC/POS bytes
//! - [`charset`]: 8-bit character tables (CP860, CP850)
//! - [`markdown`]: the small markdown dialect used for free-form messages
//! - [`encoder`]: [`PrintContent`] → [`ByteStream`]
//! - [`preview`]: bytes → [`Preview`] blocks for on-screen display
//!
//! Nothing here performs IO.

pub mod charset;
pub mod command;
pub mod content;
pub mod encoder;
pub mod error;
pub mod markdown;
pub mod preview;

pub use charset::CharacterTable;
pub use command::{Alignment, ByteStream, CutKind, Op};
pub use content::{
    DailyTasks, EmployeeGroup, MenuDay, Message, PrintContent, TaskLine, UNASSIGNED_GROUP, WeeklyMenu,
};
pub use encoder::{EncoderConfig, encode};
pub use error::EncodingError;
pub use preview::{Block, Line, Preview, PreviewBuilder, Scanner, Span, Style, decode};
