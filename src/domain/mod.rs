/*!
 * Domain Module
 * Pure content-model rules shared by the public and admin route handlers:
 * slug derivation, rich-text handling, publish lifecycle, validation,
 * and the static metadata tables for enumerated fields.
 */

pub mod platform;
pub mod publish;
pub mod richtext;
pub mod slug;
pub mod sport;
pub mod tech_stack;
pub mod validate;
