//! Admin Directory API adapter for the mailing-list group.

use serde::Deserialize;
use serde_json::json;

use roster_core::{GroupKey, GroupMember, MemberId};
use roster_sync::{GroupProvider, MemberPage, ProviderError};

use crate::google_auth::TokenSource;
use crate::http::{agent, bearer, classify, read_json};

pub const DIRECTORY_URL: &str = "https://admin.googleapis.com";

/// Largest page the members endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 200;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MembersResponse {
    #[serde(default)]
    members: Vec<GroupMember>,
    #[serde(default)]
    next_page_token: Option<String>,
}

pub struct DirectoryGroups<T> {
    auth: T,
    base_url: String,
    agent: ureq::Agent,
}

impl<T: TokenSource> DirectoryGroups<T> {
    pub fn new(auth: T) -> Self {
        Self::with_base_url(auth, DIRECTORY_URL)
    }

    pub fn with_base_url(auth: T, base_url: &str) -> Self {
        Self {
            auth,
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: agent(),
        }
    }

    fn members_url(&self, group: &GroupKey) -> String {
        format!(
            "{}/admin/directory/v1/groups/{}/members",
            self.base_url,
            urlencoding::encode(&group.0)
        )
    }
}

impl<T: TokenSource> GroupProvider for DirectoryGroups<T> {
    fn list_members(
        &self,
        group: &GroupKey,
        page_token: Option<&str>,
    ) -> Result<MemberPage, ProviderError> {
        let token = self.auth.access_token()?;
        let mut request = self
            .agent
            .get(&self.members_url(group))
            .set("Authorization", &bearer(&token))
            .query("maxResults", &MAX_PAGE_SIZE.to_string());
        if let Some(page_token) = page_token {
            request = request.query("pageToken", page_token);
        }

        let response = request.call().map_err(classify)?;
        let body: MembersResponse = read_json(response)?;
        Ok(MemberPage {
            members: body.members,
            next_page_token: body.next_page_token,
        })
    }

    fn add_member(&self, group: &GroupKey, email: &str) -> Result<(), ProviderError> {
        let token = self.auth.access_token()?;
        self.agent
            .post(&self.members_url(group))
            .set("Authorization", &bearer(&token))
            .send_json(json!({ "email": email, "role": "MEMBER" }))
            .map_err(classify)?;
        Ok(())
    }

    fn remove_member(&self, group: &GroupKey, member: &MemberId) -> Result<(), ProviderError> {
        let token = self.auth.access_token()?;
        self.agent
            .delete(&format!(
                "{}/{}",
                self.members_url(group),
                urlencoding::encode(&member.0)
            ))
            .set("Authorization", &bearer(&token))
            .call()
            .map_err(classify)?;
        Ok(())
    }
}
