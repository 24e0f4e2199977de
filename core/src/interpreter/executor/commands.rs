//! Command tags recognised by the dispatcher
//!
//! Tags are matched ignoring ASCII case. Anything else is `Unknown` and is
//! routed to the host's plugin command resolver.

/// One variant per built-in command kind
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    // Variables
    Set,
    SetVar,
    Get,
    Increment,
    Decrement,
    Multiply,
    Divide,
    Calculate,
    Toggle,
    Append,
    Clear,

    // Text
    Substring,
    Replace,
    ToUpper,
    ToLower,
    Length,
    NewGuid,
    Now,
    CallFunction,

    // Host
    Show,
    Hide,
    Enable,
    Disable,
    CopyProperty,
    Navigate,
    OpenWindow,
    CloseWindow,
    CopyToClipboard,
    PasteFromClipboard,
    Alert,
    Log,
    Delay,

    // Control flow
    If,
    Switch,
    ForEach,
    While,
    TryCatch,
    Call,
    Sequence,
    Throw,

    Unknown,
}

impl Command {
    pub fn from_tag(tag: &str) -> Command {
        match tag.to_ascii_lowercase().as_str() {
            "set" => Command::Set,
            "setvar" => Command::SetVar,
            "get" => Command::Get,
            "increment" => Command::Increment,
            "decrement" => Command::Decrement,
            "multiply" => Command::Multiply,
            "divide" => Command::Divide,
            "calculate" => Command::Calculate,
            "toggle" => Command::Toggle,
            "append" => Command::Append,
            "clear" => Command::Clear,
            "substring" => Command::Substring,
            "replace" => Command::Replace,
            "toupper" => Command::ToUpper,
            "tolower" => Command::ToLower,
            "length" => Command::Length,
            "newguid" => Command::NewGuid,
            "now" => Command::Now,
            "callfunction" => Command::CallFunction,
            "show" => Command::Show,
            "hide" => Command::Hide,
            "enable" => Command::Enable,
            "disable" => Command::Disable,
            "copyproperty" => Command::CopyProperty,
            "navigate" => Command::Navigate,
            "openwindow" => Command::OpenWindow,
            "closewindow" => Command::CloseWindow,
            "copytoclipboard" => Command::CopyToClipboard,
            "pastefromclipboard" => Command::PasteFromClipboard,
            "alert" => Command::Alert,
            "log" => Command::Log,
            "delay" => Command::Delay,
            "if" => Command::If,
            "switch" => Command::Switch,
            "foreach" => Command::ForEach,
            "while" => Command::While,
            "trycatch" => Command::TryCatch,
            "call" => Command::Call,
            "sequence" => Command::Sequence,
            "throw" => Command::Throw,
            _ => Command::Unknown,
        }
    }

    /// Commands that recurse back into the dispatcher
    pub fn is_control_flow(self) -> bool {
        matches!(
            self,
            Command::If
                | Command::Switch
                | Command::ForEach
                | Command::While
                | Command::TryCatch
                | Command::Call
                | Command::Sequence
        )
    }
}
