//! Host actions mapped onto LinkedIn calls.

use super::host::{ChatInfo, ChatMember};
use super::LinkedInBridge;
use crate::attributed::AttributedText;
use crate::client::{MediaUploadType, SearchHit};
use crate::error::Result;
use crate::model::{FileAttachment, ImageAttachment, RenderContent, RepliedMessage, VectorImage};
use crate::urn::Urn;
use chrono::{DateTime, Utc};
use std::io::Cursor;
use tracing::{debug, warn};

/// An outgoing message from the host side.
#[derive(Debug, Clone, Default)]
pub struct MatrixMessage {
    pub text: String,
    /// Formatted body; takes precedence over `text` when present.
    pub html: Option<String>,
    pub reply_to: Option<Urn>,
    pub media: Option<MediaUpload>,
}

#[derive(Debug, Clone)]
pub struct MediaUpload {
    pub filename: String,
    pub mime_type: String,
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendResponse {
    pub id: Urn,
    pub timestamp: DateTime<Utc>,
    pub sender: Urn,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedIdentifier {
    pub user: Urn,
    /// The DM with `user`, if one exists or was created.
    pub chat: Option<Urn>,
}

impl LinkedInBridge {
    fn body_of(&self, message: &MatrixMessage) -> AttributedText {
        match &message.html {
            Some(html) => self.converter.to_attributed(html),
            None => AttributedText::plain(message.text.clone()),
        }
    }

    pub async fn handle_matrix_message(
        &self,
        conversation: &Urn,
        message: MatrixMessage,
    ) -> Result<SendResponse> {
        let body = self.body_of(&message);
        let mut render_content = Vec::new();

        if let Some(media) = message.media {
            render_content.push(self.upload(media).await?);
        }
        if let Some(reply_to) = &message.reply_to {
            render_content.push(self.reply_content(reply_to).await);
        }

        let sent = self
            .client
            .send_message(conversation, &body, &render_content)
            .await?;
        Ok(SendResponse {
            id: sent.message_urn,
            timestamp: sent.delivered_at,
            sender: self.client.mailbox_urn().await?,
        })
    }

    async fn upload(&self, media: MediaUpload) -> Result<RenderContent> {
        let upload_type = MediaUploadType::for_mime(&media.mime_type);
        let size = media.data.len() as u64;
        let asset = self
            .client
            .upload_media(
                upload_type,
                &media.filename,
                &media.mime_type,
                size,
                Cursor::new(media.data),
            )
            .await?;
        debug!(%asset, ?upload_type, size, "uploaded attachment");

        Ok(match upload_type {
            MediaUploadType::Photo => RenderContent::Image(ImageAttachment {
                digitalmedia_asset: Some(asset),
                image: VectorImage::default(),
            }),
            _ => RenderContent::File(FileAttachment {
                asset_urn: asset,
                byte_size: size,
                media_type: media.mime_type,
                name: media.filename,
                url: None,
            }),
        })
    }

    async fn reply_content(&self, reply_to: &Urn) -> RenderContent {
        let replied = match self.host.get_message(reply_to).await {
            Some(stored) => RepliedMessage {
                original_message_urn: reply_to.clone(),
                original_sender_urn: Some(stored.sender),
                original_send_at: Some(stored.timestamp),
                message_body: AttributedText::plain(stored.text.unwrap_or_default()),
            },
            None => {
                debug!(message = %reply_to, "replying to a message the host does not know");
                RepliedMessage {
                    original_message_urn: reply_to.clone(),
                    original_sender_urn: None,
                    original_send_at: None,
                    message_body: AttributedText::default(),
                }
            }
        };
        RenderContent::RepliedMessage(replied)
    }

    pub async fn handle_matrix_edit(&self, target: &Urn, message: MatrixMessage) -> Result<()> {
        let body = self.body_of(&message);
        self.client.edit_message(target, &body).await
    }

    pub async fn handle_matrix_message_remove(&self, target: &Urn) -> Result<()> {
        self.client.recall_message(target).await
    }

    pub async fn handle_matrix_reaction(&self, target: &Urn, emoji: &str) -> Result<()> {
        self.client.send_reaction(target, emoji).await
    }

    pub async fn handle_matrix_reaction_remove(&self, target: &Urn, emoji: &str) -> Result<()> {
        self.client.remove_reaction(target, emoji).await
    }

    pub async fn handle_matrix_read_receipt(&self, conversation: &Urn) -> Result<()> {
        let statuses = self
            .client
            .mark_conversations_read(std::slice::from_ref(conversation))
            .await?;
        match statuses.get(conversation) {
            Some(status) if *status >= 400 => {
                warn!(%conversation, status, "marking conversation read was rejected")
            }
            None => warn!(%conversation, "no read status returned for conversation"),
            Some(_) => {}
        }
        Ok(())
    }

    /// LinkedIn has no "stopped typing" call; indicators expire server-side.
    pub async fn handle_matrix_typing(&self, conversation: &Urn, typing: bool) -> Result<()> {
        if !typing {
            return Ok(());
        }
        self.client.start_typing(conversation).await
    }

    pub async fn resolve_identifier(&self, user: &Urn, create: bool) -> Result<ResolvedIdentifier> {
        let mut chat = self.host.find_dm_chat(user).await;
        if chat.is_none() && create {
            let created = self.client.new_chat("", std::slice::from_ref(user)).await?;
            debug!(%user, conversation = %created, "created direct chat");
            chat = Some(created);
        }
        Ok(ResolvedIdentifier {
            user: user.clone(),
            chat,
        })
    }

    pub async fn create_group(&self, name: &str, participants: &[Urn]) -> Result<ChatInfo> {
        let conversation = self.client.new_chat(name, participants).await?;
        let own = self.client.mailbox_urn().await?;

        let mut members = vec![ChatMember {
            id: own.clone(),
            name: String::new(),
            avatar_url: None,
            profile_url: None,
            is_from_me: true,
        }];
        members.extend(
            participants
                .iter()
                .filter(|urn| **urn != own)
                .map(|urn| ChatMember {
                    id: urn.clone(),
                    name: String::new(),
                    avatar_url: None,
                    profile_url: None,
                    is_from_me: false,
                }),
        );

        Ok(ChatInfo {
            conversation,
            name: Some(name.to_string()).filter(|n| !n.is_empty()),
            is_group: true,
            members,
            unread: false,
            last_activity_at: None,
        })
    }

    pub async fn search_users(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.client.search_hits(query).await
    }
}
