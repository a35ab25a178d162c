use super::endpoints;
use super::{expect_status, Client};
use crate::error::Result;
use reqwest::Method;
use tracing::info;

const TAG_MAP: u8 = 0x00;
const TAG_ARRAY: u8 = 0x01;
const TAG_TRUE: u8 = 0x08;
const TAG_STRING: u8 = 0x14;

/// Encode the deduped-protobuf body LinkedIn expects for push registration:
/// a two-entry map of `pushNotificationTokens: [token]` and
/// `pushNotificationEnabled: true`.
pub fn encode_push_registration(token: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(token.len() + 64);
    out.push(TAG_MAP);
    out.push(2);
    push_string(&mut out, "pushNotificationTokens");
    out.push(TAG_ARRAY);
    out.push(1);
    push_string(&mut out, token);
    push_string(&mut out, "pushNotificationEnabled");
    out.push(TAG_TRUE);
    out
}

fn push_string(out: &mut Vec<u8>, value: &str) {
    out.push(TAG_STRING);
    push_varint(out, value.len() as u64);
    out.extend_from_slice(value.as_bytes());
}

fn push_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

impl Client {
    pub async fn register_android_push(&self, token: &str) -> Result<()> {
        let response = self
            .request(Method::POST, endpoints::PUSH_REGISTRATION)
            .with_query_param("action", endpoints::ACTION_REGISTER)
            .with_csrf()
            .with_content_type(endpoints::push_content_type())
            .with_accept("application/vnd.linkedin.deduped+x-protobuf")
            .with_body(encode_push_registration(token))
            .send()
            .await?;
        expect_status("register_android_push", response.status(), 200)?;
        info!("registered Android push token");
        Ok(())
    }
}
