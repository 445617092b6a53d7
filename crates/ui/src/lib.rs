#![deny(unsafe_code)]

/// Client core of the reviewed message list.
///
/// The rendering layer stays outside this crate: it feeds user input into
/// [`chat::MessageListController`], draws [`chat::MessageRow`]s and reacts to
/// [`chat::ListEvent`]s. Persistence goes through `lectern-storage`.
pub mod chat;
/// Settings persistence.
pub mod settings;
