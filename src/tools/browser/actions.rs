//! The fixed browser action vocabulary
//!
//! Every function call the model issues is parsed into a [`BrowserAction`].
//! Parsing validates the argument contract of each action; the `Display`
//! impl is the canonical one-line rendering used in prompts and logs.

use std::fmt;

use serde_json::Value;

use crate::core::{FunctionCall, PilotError, Result};

/// Names of all supported actions
pub const ACTION_NAMES: [&str; 13] = [
    "click_at",
    "type_text_at",
    "scroll_document",
    "scroll_at",
    "navigate",
    "go_back",
    "go_forward",
    "hover_at",
    "key_combination",
    "drag_and_drop",
    "wait_5_seconds",
    "search",
    "open_web_browser",
];

/// Whether `name` belongs to the action vocabulary
pub fn is_known_action(name: &str) -> bool {
    ACTION_NAMES.contains(&name)
}

/// Scroll direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }

    /// Whether scrolling happens along the vertical axis
    pub fn is_vertical(&self) -> bool {
        matches!(self, Direction::Up | Direction::Down)
    }
}

impl std::str::FromStr for Direction {
    type Err = PilotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "up" => Ok(Direction::Up),
            "down" => Ok(Direction::Down),
            "left" => Ok(Direction::Left),
            "right" => Ok(Direction::Right),
            other => Err(PilotError::Other(format!("invalid direction '{}'", other))),
        }
    }
}

/// One model-issued browser action, coordinates in normalized model space
#[derive(Debug, Clone, PartialEq)]
pub enum BrowserAction {
    ClickAt {
        x: i64,
        y: i64,
    },
    TypeTextAt {
        x: i64,
        y: i64,
        text: String,
        press_enter: bool,
        clear_before_typing: bool,
    },
    ScrollDocument {
        direction: Direction,
    },
    ScrollAt {
        x: i64,
        y: i64,
        direction: Direction,
        magnitude: Option<i64>,
    },
    Navigate {
        url: String,
    },
    GoBack,
    GoForward,
    HoverAt {
        x: i64,
        y: i64,
    },
    KeyCombination {
        keys: String,
    },
    DragAndDrop {
        x: i64,
        y: i64,
        destination_x: i64,
        destination_y: i64,
    },
    Wait5Seconds,
    Search,
    OpenWebBrowser,
}

fn require_i64(call: &FunctionCall, key: &str) -> Result<i64> {
    call.get_i64(key)
        .ok_or_else(|| PilotError::invalid_args(&call.name, format!("missing numeric '{}'", key)))
}

fn require_string(call: &FunctionCall, key: &str) -> Result<String> {
    call.get_string(key)
        .ok_or_else(|| PilotError::invalid_args(&call.name, format!("missing string '{}'", key)))
}

fn require_direction(call: &FunctionCall) -> Result<Direction> {
    require_string(call, "direction")?
        .parse()
        .map_err(|e: PilotError| PilotError::invalid_args(&call.name, e.to_string()))
}

impl BrowserAction {
    /// Parse a function call into an action.
    ///
    /// Names outside the vocabulary yield `UnknownAction`; contract
    /// violations yield `InvalidArgs`.
    pub fn from_call(call: &FunctionCall) -> Result<Self> {
        let action = match call.name.as_str() {
            "click_at" => BrowserAction::ClickAt {
                x: require_i64(call, "x")?,
                y: require_i64(call, "y")?,
            },
            "type_text_at" => BrowserAction::TypeTextAt {
                x: require_i64(call, "x")?,
                y: require_i64(call, "y")?,
                text: require_string(call, "text")?,
                press_enter: call.get_bool("press_enter").unwrap_or(false),
                clear_before_typing: call.get_bool("clear_before_typing").unwrap_or(false),
            },
            "scroll_document" => BrowserAction::ScrollDocument {
                direction: require_direction(call)?,
            },
            "scroll_at" => BrowserAction::ScrollAt {
                x: require_i64(call, "x")?,
                y: require_i64(call, "y")?,
                direction: require_direction(call)?,
                magnitude: call.get_i64("magnitude"),
            },
            "navigate" => BrowserAction::Navigate {
                url: require_string(call, "url")?,
            },
            "go_back" => BrowserAction::GoBack,
            "go_forward" => BrowserAction::GoForward,
            "hover_at" => BrowserAction::HoverAt {
                x: require_i64(call, "x")?,
                y: require_i64(call, "y")?,
            },
            "key_combination" => BrowserAction::KeyCombination {
                keys: require_string(call, "keys")?,
            },
            "drag_and_drop" => BrowserAction::DragAndDrop {
                x: require_i64(call, "x")?,
                y: require_i64(call, "y")?,
                destination_x: require_i64(call, "destination_x")?,
                destination_y: require_i64(call, "destination_y")?,
            },
            "wait_5_seconds" => BrowserAction::Wait5Seconds,
            "search" => BrowserAction::Search,
            "open_web_browser" => BrowserAction::OpenWebBrowser,
            other => return Err(PilotError::UnknownAction(other.to_string())),
        };
        Ok(action)
    }

    /// Wire name of the action
    pub fn name(&self) -> &'static str {
        match self {
            BrowserAction::ClickAt { .. } => "click_at",
            BrowserAction::TypeTextAt { .. } => "type_text_at",
            BrowserAction::ScrollDocument { .. } => "scroll_document",
            BrowserAction::ScrollAt { .. } => "scroll_at",
            BrowserAction::Navigate { .. } => "navigate",
            BrowserAction::GoBack => "go_back",
            BrowserAction::GoForward => "go_forward",
            BrowserAction::HoverAt { .. } => "hover_at",
            BrowserAction::KeyCombination { .. } => "key_combination",
            BrowserAction::DragAndDrop { .. } => "drag_and_drop",
            BrowserAction::Wait5Seconds => "wait_5_seconds",
            BrowserAction::Search => "search",
            BrowserAction::OpenWebBrowser => "open_web_browser",
        }
    }
}

/// Truncate typed text for display, 30 characters plus an ellipsis
fn display_text(text: &str) -> String {
    const MAX: usize = 30;
    if text.chars().count() > MAX {
        let head: String = text.chars().take(MAX).collect();
        format!("{}...", head)
    } else {
        text.to_string()
    }
}

impl fmt::Display for BrowserAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BrowserAction::ClickAt { x, y } => write!(f, "click_at({}, {})", x, y),
            BrowserAction::TypeTextAt {
                x,
                y,
                text,
                press_enter,
                clear_before_typing,
            } => {
                write!(f, "type_text_at({}, {}, \"{}\"", x, y, display_text(text))?;
                if *press_enter {
                    write!(f, ", press_enter=true")?;
                }
                if *clear_before_typing {
                    write!(f, ", clear_before_typing=true")?;
                }
                write!(f, ")")
            }
            BrowserAction::ScrollDocument { direction } => {
                write!(f, "scroll_document({})", direction.as_str())
            }
            BrowserAction::ScrollAt {
                x,
                y,
                direction,
                magnitude,
            } => match magnitude {
                Some(m) => write!(f, "scroll_at({}, {}, {}, {})", x, y, direction.as_str(), m),
                None => write!(f, "scroll_at({}, {}, {})", x, y, direction.as_str()),
            },
            BrowserAction::Navigate { url } => write!(f, "navigate(\"{}\")", url),
            BrowserAction::GoBack => write!(f, "go_back()"),
            BrowserAction::GoForward => write!(f, "go_forward()"),
            BrowserAction::HoverAt { x, y } => write!(f, "hover_at({}, {})", x, y),
            BrowserAction::KeyCombination { keys } => write!(f, "key_combination(\"{}\")", keys),
            BrowserAction::DragAndDrop {
                x,
                y,
                destination_x,
                destination_y,
            } => write!(
                f,
                "drag_and_drop({}, {} -> {}, {})",
                x, y, destination_x, destination_y
            ),
            BrowserAction::Wait5Seconds => write!(f, "wait_5_seconds()"),
            BrowserAction::Search => write!(f, "search()"),
            BrowserAction::OpenWebBrowser => write!(f, "open_web_browser()"),
        }
    }
}

/// Render any function call for display, falling back to raw arguments
/// when it does not parse as a known action.
pub fn format_call(call: &FunctionCall) -> String {
    match BrowserAction::from_call(call) {
        Ok(action) => action.to_string(),
        Err(_) => {
            let mut args = call.args.clone();
            args.remove("safety_decision");
            format!("{}({})", call.name, Value::Object(args))
        }
    }
}

/// Map one key token to its canonical DOM key name
pub fn resolve_key(token: &str) -> String {
    let lower = token.trim().to_ascii_lowercase();
    let mapped = match lower.as_str() {
        "backspace" => "Backspace",
        "tab" => "Tab",
        "return" | "enter" => "Enter",
        "shift" => "Shift",
        "control" | "ctrl" => "Control",
        "alt" => "Alt",
        "escape" | "esc" => "Escape",
        "space" => " ",
        "pageup" => "PageUp",
        "pagedown" => "PageDown",
        "end" => "End",
        "home" => "Home",
        "left" => "ArrowLeft",
        "up" => "ArrowUp",
        "right" => "ArrowRight",
        "down" => "ArrowDown",
        "insert" => "Insert",
        "delete" => "Delete",
        "command" | "cmd" | "meta" => "Meta",
        _ => return token.trim().to_string(),
    };
    mapped.to_string()
}

/// Split a `+`-joined combination such as `"Control+Shift+t"` into keys
pub fn parse_key_combination(keys: &str) -> Vec<String> {
    keys.split('+')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(resolve_key)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn call(name: &str, args: Value) -> FunctionCall {
        FunctionCall::new(name, args)
    }

    #[test]
    fn test_vocabulary_size() {
        assert_eq!(ACTION_NAMES.len(), 13);
        assert!(is_known_action("drag_and_drop"));
        assert!(!is_known_action("browser_click"));
    }

    #[test]
    fn test_parse_every_name() {
        let samples = [
            call("click_at", json!({"x": 1, "y": 2})),
            call("type_text_at", json!({"x": 1, "y": 2, "text": "a"})),
            call("scroll_document", json!({"direction": "down"})),
            call("scroll_at", json!({"x": 1, "y": 2, "direction": "up"})),
            call("navigate", json!({"url": "example.com"})),
            call("go_back", json!({})),
            call("go_forward", json!({})),
            call("hover_at", json!({"x": 1, "y": 2})),
            call("key_combination", json!({"keys": "Control+C"})),
            call(
                "drag_and_drop",
                json!({"x": 1, "y": 2, "destination_x": 3, "destination_y": 4}),
            ),
            call("wait_5_seconds", json!({})),
            call("search", json!({})),
            call("open_web_browser", json!({})),
        ];
        for sample in &samples {
            let action = BrowserAction::from_call(sample).unwrap();
            assert_eq!(action.name(), sample.name);
        }
    }

    #[test]
    fn test_unknown_action() {
        let err = BrowserAction::from_call(&call("teleport", json!({}))).unwrap_err();
        assert!(matches!(err, PilotError::UnknownAction(name) if name == "teleport"));
    }

    #[test]
    fn test_missing_argument() {
        let err = BrowserAction::from_call(&call("click_at", json!({"x": 5}))).unwrap_err();
        assert!(matches!(err, PilotError::InvalidArgs { .. }));
    }

    #[test]
    fn test_format_click() {
        let action = BrowserAction::from_call(&call("click_at", json!({"x": 412, "y": 780})))
            .unwrap();
        assert_eq!(action.to_string(), "click_at(412, 780)");
    }

    #[test]
    fn test_format_type_text_truncates() {
        let action = BrowserAction::from_call(&call(
            "type_text_at",
            json!({
                "x": 10,
                "y": 20,
                "text": "abcdefghijklmnopqrstuvwxyz0123456789",
                "press_enter": true
            }),
        ))
        .unwrap();
        assert_eq!(
            action.to_string(),
            "type_text_at(10, 20, \"abcdefghijklmnopqrstuvwxyz0123...\", press_enter=true)"
        );
    }

    #[test]
    fn test_format_unknown_call_hides_safety_decision() {
        let text = format_call(&call(
            "teleport",
            json!({"to": "mars", "safety_decision": {"decision": "require_confirmation"}}),
        ));
        assert_eq!(text, "teleport({\"to\":\"mars\"})");
    }

    #[test]
    fn test_key_aliases() {
        assert_eq!(
            parse_key_combination("ctrl+SHIFT+t"),
            vec!["Control", "Shift", "t"]
        );
        assert_eq!(parse_key_combination("Cmd+Return"), vec!["Meta", "Enter"]);
        assert_eq!(parse_key_combination("esc"), vec!["Escape"]);
        assert_eq!(parse_key_combination("PageDown"), vec!["PageDown"]);
        assert_eq!(parse_key_combination("left+up"), vec!["ArrowLeft", "ArrowUp"]);
    }
}
