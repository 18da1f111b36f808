use crate::voice::{ChatSink, Controller};

/// Status line for `listeners` people dancing along.
pub fn presence_text(listeners: usize) -> String {
    match listeners {
        0 => "caramelldansen".to_string(),
        1 => "for 1 dancer".to_string(),
        n => format!("for {} dancers", n),
    }
}

pub async fn update_presence(controller: &Controller, chat: &dyn ChatSink) {
    let listeners = controller.listener_count().await;
    chat.set_presence(&presence_text(listeners)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pluralizes_dancers() {
        assert_eq!(presence_text(0), "caramelldansen");
        assert_eq!(presence_text(1), "for 1 dancer");
        assert_eq!(presence_text(7), "for 7 dancers");
    }
}
