use std::fmt;

use crate::signer::percent_encode;

/// Twitter REST endpoints, as path templates relative to the API base.
///
/// Templates take positional `{}` arguments, see [`interpolate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    HomeTimeline,
    UserTimeline,
    MentionsTimeline,
    /// `{}`: status id
    ShowStatus,
    UpdateStatus,
    /// Multipart: the status plus `media[]` files.
    UpdateWithMedia,
    /// `{}`: status id
    DestroyStatus,
    /// `{}`: status id
    Retweet,
    FavoritesList,
    FavoritesCreate,
    FavoritesDestroy,
    FollowersIds,
    FriendsIds,
    FriendshipsCreate,
    FriendshipsDestroy,
    FriendshipsShow,
    UsersShow,
    DirectMessages,
    VerifyCredentials,
    AccessToken,
}

impl Endpoint {
    pub fn template(self) -> &'static str {
        match self {
            Endpoint::HomeTimeline => "/1.1/statuses/home_timeline.json",
            Endpoint::UserTimeline => "/1.1/statuses/user_timeline.json",
            Endpoint::MentionsTimeline => "/1.1/statuses/mentions_timeline.json",
            Endpoint::ShowStatus => "/1.1/statuses/show/{}.json",
            Endpoint::UpdateStatus => "/1.1/statuses/update.json",
            Endpoint::UpdateWithMedia => "/1.1/statuses/update_with_media.json",
            Endpoint::DestroyStatus => "/1.1/statuses/destroy/{}.json",
            Endpoint::Retweet => "/1.1/statuses/retweet/{}.json",
            Endpoint::FavoritesList => "/1.1/favorites/list.json",
            Endpoint::FavoritesCreate => "/1.1/favorites/create.json",
            Endpoint::FavoritesDestroy => "/1.1/favorites/destroy.json",
            Endpoint::FollowersIds => "/1.1/followers/ids.json",
            Endpoint::FriendsIds => "/1.1/friends/ids.json",
            Endpoint::FriendshipsCreate => "/1.1/friendships/create.json",
            Endpoint::FriendshipsDestroy => "/1.1/friendships/destroy.json",
            Endpoint::FriendshipsShow => "/1.1/friendships/show.json",
            Endpoint::UsersShow => "/1.1/users/show.json",
            Endpoint::DirectMessages => "/1.1/direct_messages/events/list.json",
            Endpoint::VerifyCredentials => "/1.1/account/verify_credentials.json",
            Endpoint::AccessToken => "/oauth/access_token",
        }
    }

    /// Full URL under `api_base`, with the template's arguments filled in.
    pub fn url<A: fmt::Display>(self, api_base: &str, args: &[A]) -> String {
        format!(
            "{}{}",
            api_base.trim_end_matches('/'),
            interpolate(self.template(), args)
        )
    }
}

/// Well known request parameter names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Param {
    SinceId,
    MaxId,
    Count,
    Page,
    ScreenName,
    UserId,
    IncludeRts,
    IncludeEntities,
    SourceScreenName,
    TargetScreenName,
    Follow,
    Text,
    Status,
    Id,
}

impl Param {
    pub fn as_str(self) -> &'static str {
        match self {
            Param::SinceId => "since_id",
            Param::MaxId => "max_id",
            Param::Count => "count",
            Param::Page => "page",
            Param::ScreenName => "screen_name",
            Param::UserId => "user_id",
            Param::IncludeRts => "include_rts",
            Param::IncludeEntities => "include_entities",
            Param::SourceScreenName => "source_screen_name",
            Param::TargetScreenName => "target_screen_name",
            Param::Follow => "follow",
            Param::Text => "text",
            Param::Status => "status",
            Param::Id => "id",
        }
    }
}

impl AsRef<str> for Param {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replaces each `{}` in `template` with the next argument, in order.
///
/// Each argument is percent-encoded as one path segment, so `/`, `?` and `#`
/// inside it cannot change the route. Placeholders without an argument stay
/// as they are; surplus arguments are dropped.
pub fn interpolate<A: fmt::Display>(template: &str, args: &[A]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut rest = template;
    while let Some(at) = rest.find("{}") {
        out.push_str(&rest[..at]);
        match args.next() {
            Some(arg) => out.push_str(&percent_encode(&arg.to_string())),
            None => out.push_str("{}"),
        }
        rest = &rest[at + 2..];
    }
    out.push_str(rest);
    out
}
