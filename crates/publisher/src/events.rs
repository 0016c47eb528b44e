//! Transport event handling capability.
use {async_trait::async_trait, herald_irc::IrcEvent};

/// Reactions to transport events. Implemented by the engine.
#[async_trait]
pub trait IrcEventHandler: Send {
    async fn on_welcome(&mut self, nickname: String);
    async fn on_join(&mut self, channel: String);
    async fn on_part(&mut self, channel: String);
    async fn on_kick(&mut self, channel: String, by: String);
    async fn on_invite(&mut self, channel: String, by: String);
    async fn on_private_message(&mut self, from: String);
    async fn on_nickname_in_use(&mut self);
    async fn on_nick_changed(&mut self, nickname: String);
    async fn on_disconnect(&mut self, reason: String);
}

/// Route one event to the matching handler method.
pub async fn dispatch<H: IrcEventHandler + ?Sized>(handler: &mut H, event: IrcEvent) {
    match event {
        IrcEvent::Welcome { nickname } => handler.on_welcome(nickname).await,
        IrcEvent::Join { channel } => handler.on_join(channel).await,
        IrcEvent::Part { channel } => handler.on_part(channel).await,
        IrcEvent::Kick { channel, by } => handler.on_kick(channel, by).await,
        IrcEvent::Invite { channel, by } => handler.on_invite(channel, by).await,
        IrcEvent::PrivateMessage { from } => handler.on_private_message(from).await,
        IrcEvent::NicknameInUse => handler.on_nickname_in_use().await,
        IrcEvent::NickChanged { nickname } => handler.on_nick_changed(nickname).await,
        IrcEvent::Disconnected { reason } => handler.on_disconnect(reason).await,
    }
}
