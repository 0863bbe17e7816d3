use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::debug;

use crate::model::{
    DataEnvelope, GroupInfo, GroupMembership, GroupRoleEntry, Headshot, RobloxUser, RoverLink,
    RoverResponse, UsernameLookupRequest, membership_in,
};

const USERS_API: &str = "https://users.roblox.com/v1";
const GROUPS_API: &str = "https://groups.roblox.com/v1";
const THUMBNAILS_API: &str = "https://thumbnails.roblox.com/v1";
const ROVER_API: &str = "https://registry.rover.link/api";

#[derive(Debug, Error)]
pub enum RobloxError {
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },
}

#[derive(Clone, Debug)]
pub struct RobloxClient {
    http: reqwest::Client,
    group_id: u64,
    rover_api_key: Option<String>,
}

impl RobloxClient {
    pub fn new(group_id: u64, rover_api_key: Option<String>) -> Result<Self, RobloxError> {
        let http = reqwest::Client::builder()
            .user_agent("mooncrest-bot/0.1")
            .connect_timeout(Duration::from_secs(3))
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|source| RobloxError::Request {
                endpoint: "client",
                source,
            })?;

        Ok(Self {
            http,
            group_id,
            rover_api_key: rover_api_key.filter(|key| !key.trim().is_empty()),
        })
    }

    pub fn group_id(&self) -> u64 {
        self.group_id
    }

    pub fn rover_enabled(&self) -> bool {
        self.rover_api_key.is_some()
    }

    /// Resolve an exact username. `Ok(None)` when no such account exists.
    pub async fn user_by_username(&self, username: &str) -> Result<Option<RobloxUser>, RobloxError> {
        const ENDPOINT: &str = "users/usernames";

        let request = self
            .http
            .post(format!("{USERS_API}/usernames/users"))
            .json(&UsernameLookupRequest {
                usernames: [username.trim()],
                exclude_banned_users: false,
            });

        let envelope: DataEnvelope<RobloxUser> = send_json(ENDPOINT, request).await?;
        Ok(envelope.data.into_iter().next())
    }

    pub async fn user_by_id(&self, user_id: u64) -> Result<Option<RobloxUser>, RobloxError> {
        const ENDPOINT: &str = "users/id";

        let response = self
            .http
            .get(format!("{USERS_API}/users/{user_id}"))
            .send()
            .await
            .map_err(|source| RobloxError::Request {
                endpoint: ENDPOINT,
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        parse_response(ENDPOINT, response).await.map(Some)
    }

    pub async fn avatar_headshot(&self, user_id: u64) -> Result<Option<String>, RobloxError> {
        const ENDPOINT: &str = "thumbnails/headshot";

        let request = self.http.get(format!(
            "{THUMBNAILS_API}/users/avatar-headshot?userIds={user_id}&size=420x420&format=png"
        ));

        let envelope: DataEnvelope<Headshot> = send_json(ENDPOINT, request).await?;
        Ok(envelope.data.into_iter().next().and_then(|shot| shot.image_url))
    }

    /// Membership of `user_id` in the community group, if any.
    pub async fn group_membership(&self, user_id: u64) -> Result<Option<GroupMembership>, RobloxError> {
        const ENDPOINT: &str = "groups/user-roles";

        let request = self
            .http
            .get(format!("{GROUPS_API}/users/{user_id}/groups/roles"));

        let envelope: DataEnvelope<GroupRoleEntry> = send_json(ENDPOINT, request).await?;
        Ok(membership_in(self.group_id, envelope.data))
    }

    pub async fn is_in_group(&self, user_id: u64) -> Result<bool, RobloxError> {
        Ok(self.group_membership(user_id).await?.is_some())
    }

    pub async fn group_info(&self) -> Result<GroupInfo, RobloxError> {
        let request = self
            .http
            .get(format!("{GROUPS_API}/groups/{}", self.group_id));
        send_json("groups/info", request).await
    }

    /// Look up a Discord account in the RoVer registry. Always `Ok(None)`
    /// when no API key is configured.
    pub async fn rover_link(&self, guild_id: u64, discord_id: u64) -> Result<Option<RoverLink>, RobloxError> {
        const ENDPOINT: &str = "rover/discord-to-roblox";

        let Some(api_key) = self.rover_api_key.as_deref() else {
            debug!("ROVER_API_KEY not set; skipping RoVer lookup");
            return Ok(None);
        };

        let response = self
            .http
            .get(format!(
                "{ROVER_API}/guilds/{guild_id}/discord-to-roblox/{discord_id}"
            ))
            .bearer_auth(api_key)
            .send()
            .await
            .map_err(|source| RobloxError::Request {
                endpoint: ENDPOINT,
                source,
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let parsed: RoverResponse = parse_response(ENDPOINT, response).await?;
        Ok(parsed.into_link())
    }
}

async fn send_json<T>(endpoint: &'static str, request: reqwest::RequestBuilder) -> Result<T, RobloxError>
where
    T: DeserializeOwned,
{
    let response = request
        .send()
        .await
        .map_err(|source| RobloxError::Request { endpoint, source })?;

    parse_response(endpoint, response).await
}

async fn parse_response<T>(endpoint: &'static str, response: reqwest::Response) -> Result<T, RobloxError>
where
    T: DeserializeOwned,
{
    let status = response.status();
    if !status.is_success() {
        return Err(RobloxError::Status { endpoint, status });
    }

    response
        .json::<T>()
        .await
        .map_err(|source| RobloxError::Request { endpoint, source })
}
