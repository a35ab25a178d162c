//! LinkedIn wire types to host-facing shapes.

use super::host::{Attachment, AttachmentKind, ChatInfo, ChatMember, ConvertedMessage, EventSender};
use crate::attributed::HtmlConverter;
use crate::model::{Conversation, Message, MessagingParticipant, ParticipantType, RenderContent};
use crate::urn::Urn;

pub fn event_sender(participant: &MessagingParticipant, own: &Urn) -> Option<EventSender> {
    let sender = participant.identity()?.clone();
    Some(EventSender {
        is_from_me: &sender == own,
        sender,
    })
}

pub fn convert_message(
    message: &Message,
    own: &Urn,
    converter: &dyn HtmlConverter,
) -> Option<ConvertedMessage> {
    let sender = event_sender(&message.sender, own)?;
    let html = (!message.body.is_plain()).then(|| converter.to_html(&message.body));

    let mut attachments = Vec::new();
    let mut reply_to = None;
    for content in &message.render_content {
        match content {
            RenderContent::File(file) => {
                if let Some(url) = &file.url {
                    attachments.push(Attachment {
                        kind: AttachmentKind::File,
                        url: url.clone(),
                        name: Some(file.name.clone()),
                        mime_type: Some(file.media_type.clone()),
                        size: Some(file.byte_size),
                    });
                }
            }
            RenderContent::Image(image) => {
                if let Some(url) = image.image.largest_url() {
                    attachments.push(Attachment {
                        kind: AttachmentKind::Image,
                        url,
                        name: None,
                        mime_type: None,
                        size: None,
                    });
                }
            }
            RenderContent::Video(video) => {
                if let Some((stream, url)) = video.best_stream() {
                    attachments.push(Attachment {
                        kind: AttachmentKind::Video,
                        url: url.to_string(),
                        name: None,
                        mime_type: Some(stream.media_type.clone()).filter(|m| !m.is_empty()),
                        size: Some(stream.size).filter(|s| *s > 0),
                    });
                }
            }
            RenderContent::ExternalMedia(media) => attachments.push(Attachment {
                kind: AttachmentKind::Link,
                url: media.media.url.clone(),
                name: media.title.clone(),
                mime_type: None,
                size: None,
            }),
            RenderContent::RepliedMessage(reply) => {
                reply_to = Some(reply.original_message_urn.clone());
            }
            RenderContent::Unknown => {}
        }
    }

    Some(ConvertedMessage {
        id: message.entity_urn.clone(),
        timestamp: message.delivered_at,
        sender,
        text: message.body.text.clone(),
        html,
        attachments,
        reply_to,
    })
}

pub fn chat_member(participant: &MessagingParticipant, own: &Urn) -> Option<ChatMember> {
    let id = participant.identity()?.clone();
    let (avatar_url, profile_url) = match &participant.participant_type {
        ParticipantType::Member(member) => (
            member.picture.as_ref().and_then(|p| p.largest_url()),
            member.profile_url.clone(),
        ),
        ParticipantType::Organization(org) => (
            org.logo.as_ref().and_then(|l| l.largest_url()),
            org.page_url.clone(),
        ),
        ParticipantType::Unknown => (None, None),
    };
    Some(ChatMember {
        is_from_me: &id == own,
        name: participant.display_name(),
        id,
        avatar_url,
        profile_url,
    })
}

pub fn chat_info(conversation: &Conversation, own: &Urn) -> ChatInfo {
    ChatInfo {
        conversation: conversation.entity_urn.clone(),
        name: conversation
            .title
            .clone()
            .filter(|t| !t.trim().is_empty()),
        is_group: conversation.group_chat,
        members: conversation
            .conversation_participants
            .iter()
            .filter_map(|p| chat_member(p, own))
            .collect(),
        unread: !conversation.read,
        last_activity_at: conversation.last_activity_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attributed::DefaultHtmlConverter;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn converts_formatted_reply_with_file() {
        let message: Message = serde_json::from_value(json!({
            "entityUrn": "urn:li:msg_message:(urn:li:fsd_profile:ME,2-MTcw)",
            "deliveredAt": 1_700_000_000_000i64,
            "body": {
                "text": "see file",
                "attributes": [{ "start": 0, "length": 3, "attributeKindUnion": { "bold": {} } }]
            },
            "sender": { "hostIdentityUrn": "urn:li:fsd_profile:ADA" },
            "renderContent": [
                { "file": { "assetUrn": "urn:li:digitalmediaAsset:1", "byteSize": 5, "mediaType": "text/plain", "name": "a.txt", "url": "https://files.test/a" } },
                { "repliedMessageContent": { "originalMessageUrn": "urn:li:msg_message:(urn:li:fsd_profile:ME,2-MTAw)" } }
            ]
        }))
        .unwrap();

        let own = Urn::fsd_profile("ME");
        let converted = convert_message(&message, &own, &DefaultHtmlConverter).unwrap();
        assert_eq!(converted.text, "see file");
        assert_eq!(converted.html.as_deref(), Some("<b>see</b> file"));
        assert!(!converted.sender.is_from_me);
        assert_eq!(converted.attachments.len(), 1);
        assert_eq!(converted.attachments[0].kind, AttachmentKind::File);
        assert_eq!(
            converted.reply_to.map(|u| u.to_string()).as_deref(),
            Some("urn:li:msg_message:(urn:li:fsd_profile:ME,2-MTAw)")
        );
    }

    #[test]
    fn chat_info_marks_own_member() {
        let conversation: Conversation = serde_json::from_value(json!({
            "entityUrn": "urn:li:msg_conversation:(urn:li:fsd_profile:ME,2-abc)",
            "title": "  ",
            "groupChat": true,
            "read": false,
            "conversationParticipants": [
                { "hostIdentityUrn": "urn:li:fsd_profile:ME", "participantType": { "member": { "firstName": { "text": "Me" } } } },
                { "hostIdentityUrn": "urn:li:fsd_profile:ADA", "participantType": { "member": { "firstName": { "text": "Ada" } } } },
                { "participantType": { "member": {} } }
            ]
        }))
        .unwrap();

        let info = chat_info(&conversation, &Urn::fsd_profile("ME"));
        assert_eq!(info.name, None);
        assert!(info.is_group);
        assert!(info.unread);
        assert_eq!(
            info.members
                .iter()
                .map(|m| (m.name.as_str(), m.is_from_me))
                .collect::<Vec<_>>(),
            vec![("Me", true), ("Ada", false)]
        );
    }

    #[test]
    fn sender_falls_back_to_participant_urn() {
        let message: Message = serde_json::from_value(json!({
            "entityUrn": "urn:li:msg:1",
            "conversation": { "entityUrn": "urn:li:conv:C" },
            "body": { "text": "hi" },
            "deliveredAt": 1_700_000_000_000i64,
            "sender": { "entityUrn": "urn:li:member:U" },
            "messageBodyRenderFormat": "DEFAULT"
        }))
        .unwrap();

        let converted =
            convert_message(&message, &Urn::fsd_profile("ME"), &DefaultHtmlConverter).unwrap();
        assert_eq!(converted.sender.sender.as_str(), "urn:li:member:U");
        assert!(!converted.sender.is_from_me);
        assert_eq!(converted.text, "hi");
        assert_eq!(converted.html, None);
    }
}
