//! Conversation history management
//!
//! Owns the turns sent to the model and bounds their size by stripping
//! screenshots from all but the most recent action turns.

use tracing::debug;

use crate::core::{FunctionResponse, InlineImage, Part, Turn};
use crate::tools::browser::is_known_action;

/// Manages conversation history
#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    /// Turn history, oldest first
    turns: Vec<Turn>,
    /// Action turns that keep their screenshots
    max_recent_screenshots: usize,
}

impl Conversation {
    /// Create a new conversation
    pub fn new(max_recent_screenshots: usize) -> Self {
        Self {
            turns: Vec::new(),
            max_recent_screenshots,
        }
    }

    /// Add a user turn with optional screenshot
    pub fn append_user_turn(&mut self, text: impl Into<String>, screenshot: Option<InlineImage>) {
        let mut parts = vec![Part::Text(text.into())];
        parts.extend(screenshot.map(Part::Image));
        self.turns.push(Turn::user(parts));
    }

    /// Add the model's raw content
    pub fn append_model_turn(&mut self, content: Turn) {
        self.turns.push(Turn::model(content.parts));
    }

    /// Add one turn holding every function response of a batch
    pub fn append_function_responses(&mut self, responses: Vec<FunctionResponse>) {
        if responses.is_empty() {
            return;
        }
        self.turns.push(Turn::user(
            responses.into_iter().map(Part::FunctionResponse).collect(),
        ));
    }

    /// Strip image data from action turns older than the most recent
    /// `max_recent_screenshots` image-bearing ones.
    ///
    /// Returns how many turns were stripped. Running it again without new
    /// turns is a no-op.
    pub fn prune_old_screenshots(&mut self) -> usize {
        let mut seen = 0;
        let mut stripped = 0;

        for turn in self.turns.iter_mut().rev() {
            if !carries_action_screenshot(turn) {
                continue;
            }
            seen += 1;
            if seen <= self.max_recent_screenshots {
                continue;
            }
            for part in turn.parts.iter_mut() {
                if let Part::FunctionResponse(resp) = part {
                    resp.parts.retain(|p| !p.is_image());
                }
            }
            stripped += 1;
        }

        if stripped > 0 {
            debug!(stripped, "pruned old screenshots");
        }
        stripped
    }

    /// All turns, oldest first
    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Get turn count
    pub fn len(&self) -> usize {
        self.turns.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}

/// A turn with a known action's function response that still holds an image
fn carries_action_screenshot(turn: &Turn) -> bool {
    turn.function_responses()
        .any(|resp| is_known_action(&resp.name) && resp.has_image())
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new(3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ActionResult, Role};

    fn action_turn(conv: &mut Conversation, name: &str, url: &str) {
        conv.append_function_responses(vec![FunctionResponse::from_result(
            name,
            &ActionResult::success(url),
            Some(InlineImage::png(format!("img-{}", url))),
        )]);
    }

    fn images(conv: &Conversation) -> Vec<bool> {
        conv.turns()
            .iter()
            .filter(|t| t.function_responses().next().is_some())
            .map(|t| t.function_responses().any(|r| r.has_image()))
            .collect()
    }

    #[test]
    fn test_append_roles() {
        let mut conv = Conversation::new(3);
        conv.append_user_turn("check the weather", Some(InlineImage::png("AAAA")));
        conv.append_model_turn(Turn::user(vec![Part::text("ok")]));
        conv.append_function_responses(Vec::new());

        assert_eq!(conv.len(), 2);
        assert_eq!(conv.turns()[0].role, Role::User);
        assert_eq!(conv.turns()[0].parts.len(), 2);
        assert_eq!(conv.turns()[1].role, Role::Model);
    }

    #[test]
    fn test_prune_keeps_three_most_recent() {
        let mut conv = Conversation::new(3);
        conv.append_user_turn("task", Some(InlineImage::png("start")));
        for i in 0..5 {
            action_turn(&mut conv, "click_at", &format!("https://a.com/{}", i));
        }

        assert_eq!(conv.prune_old_screenshots(), 2);
        assert_eq!(images(&conv), vec![false, false, true, true, true]);

        // Text and action fields survive.
        for (i, turn) in conv.turns().iter().skip(1).enumerate() {
            let resp = turn.function_responses().next().unwrap();
            assert_eq!(resp.name, "click_at");
            assert_eq!(resp.url(), Some(format!("https://a.com/{}", i).as_str()));
        }

        // The user's initial screenshot is not an action screenshot.
        assert!(conv.turns()[0].parts[1].is_image());
    }

    #[test]
    fn test_prune_is_idempotent() {
        let mut conv = Conversation::new(3);
        for i in 0..6 {
            action_turn(&mut conv, "navigate", &format!("https://b.com/{}", i));
        }
        conv.prune_old_screenshots();
        let once = conv.clone();
        assert_eq!(conv.prune_old_screenshots(), 0);
        assert_eq!(conv, once);
    }

    #[test]
    fn test_prune_ignores_unknown_function_names() {
        let mut conv = Conversation::new(1);
        action_turn(&mut conv, "custom_tool", "https://c.com/0");
        action_turn(&mut conv, "click_at", "https://c.com/1");
        assert_eq!(conv.prune_old_screenshots(), 0);
        assert_eq!(images(&conv), vec![true, true]);
    }

    #[test]
    fn test_prune_after_new_turn() {
        let mut conv = Conversation::new(3);
        for i in 0..3 {
            action_turn(&mut conv, "scroll_document", &format!("https://d.com/{}", i));
        }
        assert_eq!(conv.prune_old_screenshots(), 0);
        action_turn(&mut conv, "scroll_document", "https://d.com/3");
        assert_eq!(conv.prune_old_screenshots(), 1);
        assert_eq!(images(&conv), vec![false, true, true, true]);
    }
}
