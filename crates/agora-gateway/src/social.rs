use tracing::{info, warn};

use agora_db::FriendRequestOutcome;
use agora_types::events::ServerFrame;
use agora_types::models::{Friend, FriendRequest};

use crate::error::{ConflictKind, GatewayError};
use crate::gateway::Gateway;

const MAX_COLOR_LEN: usize = 64;

impl Gateway {
    /// NoRelation -> Pending.
    pub async fn send_friend_request(&self, requester: &str, addressee: &str) -> Result<(), GatewayError> {
        let addressee = addressee.trim();
        if requester.eq_ignore_ascii_case(addressee) {
            return Err(GatewayError::RelationshipConflict(ConflictKind::SelfRequest));
        }

        let (from, to) = (requester.to_string(), addressee.to_string());
        let outcome = self
            .blocking("send friend request", move |store| store.send_friend_request(&from, &to))
            .await?;

        match outcome {
            FriendRequestOutcome::Created => {}
            FriendRequestOutcome::AlreadyFriends => {
                return Err(GatewayError::RelationshipConflict(ConflictKind::AlreadyFriends));
            }
            FriendRequestOutcome::DuplicateRequest => {
                return Err(GatewayError::RelationshipConflict(ConflictKind::DuplicateRequest));
            }
            FriendRequestOutcome::UnknownUser => {
                return Err(GatewayError::UnknownUser(addressee.to_string()));
            }
        }

        info!("{} sent a friend request to {}", requester, addressee);
        self.push_friend_requests(addressee).await;
        self.push_friend_list(requester).await;
        Ok(())
    }

    /// Pending -> Accepted. `addressee` is the one accepting.
    pub async fn accept_friend_request(&self, requester: &str, addressee: &str) -> Result<(), GatewayError> {
        let (from, to) = (requester.to_string(), addressee.to_string());
        let accepted = self
            .blocking("accept friend request", move |store| store.accept_friend_request(&from, &to))
            .await?;
        if !accepted {
            return Err(GatewayError::RelationshipNotFound(requester.to_string()));
        }

        info!("{} accepted a friend request from {}", addressee, requester);
        self.push_friend_list(requester).await;
        self.push_friend_list(addressee).await;
        self.push_friend_requests(addressee).await;
        Ok(())
    }

    /// Pending -> Rejected. `addressee` is the one rejecting.
    pub async fn reject_friend_request(&self, requester: &str, addressee: &str) -> Result<(), GatewayError> {
        let (from, to) = (requester.to_string(), addressee.to_string());
        let rejected = self
            .blocking("reject friend request", move |store| store.reject_friend_request(&from, &to))
            .await?;
        if !rejected {
            return Err(GatewayError::RelationshipNotFound(requester.to_string()));
        }

        info!("{} rejected a friend request from {}", addressee, requester);
        self.push_friend_list(requester).await;
        self.push_friend_requests(addressee).await;
        Ok(())
    }

    /// Accepted -> NoRelation, from either side. Both color preferences go too.
    pub async fn remove_friend(&self, username: &str, friend: &str) -> Result<(), GatewayError> {
        let (a, b) = (username.to_string(), friend.to_string());
        let removed = self
            .blocking("remove friend", move |store| store.remove_friend(&a, &b))
            .await?;
        if !removed {
            return Err(GatewayError::RelationshipNotFound(friend.to_string()));
        }

        info!("{} removed {} as a friend", username, friend);
        self.push_friend_list(username).await;
        self.push_friend_list(friend).await;
        self.push_friend_requests(friend).await;
        Ok(())
    }

    /// Set how `viewer` sees `friend`. The reverse preference is untouched.
    pub async fn update_friend_color(&self, viewer: &str, friend: &str, color: &str) -> Result<(), GatewayError> {
        let color = color.trim();
        if color.is_empty() || color.len() > MAX_COLOR_LEN {
            return Err(GatewayError::InvalidColor);
        }

        let (v, f, c) = (viewer.to_string(), friend.to_string(), color.to_string());
        let updated = self
            .blocking("update friend color", move |store| store.update_friend_color(&v, &f, &c))
            .await?;
        if !updated {
            return Err(GatewayError::RelationshipNotFound(friend.to_string()));
        }

        self.push_friend_list(viewer).await;
        Ok(())
    }

    /// Accepted friends of `username` with the viewer's colors and live online flags.
    pub async fn friends_of(&self, username: &str) -> Result<Vec<Friend>, GatewayError> {
        let user = username.to_string();
        let mut friends = self
            .blocking("load friends", move |store| store.friends(&user))
            .await?;
        for friend in &mut friends {
            friend.is_online = self.registry().is_online(&friend.username).await;
        }
        Ok(friends)
    }

    /// Pending requests addressed to `username`.
    pub async fn friend_requests_of(&self, username: &str) -> Result<Vec<FriendRequest>, GatewayError> {
        let user = username.to_string();
        self.blocking("load friend requests", move |store| store.friend_requests(&user))
            .await
    }

    /// Push a fresh `friend_list_update` if `username` is online.
    pub(crate) async fn push_friend_list(&self, username: &str) {
        if !self.registry().is_online(username).await {
            return;
        }
        match self.friends_of(username).await {
            Ok(friends) => {
                self.registry()
                    .send_to_user(username, ServerFrame::FriendListUpdate { friends })
                    .await;
            }
            Err(e) => warn!("could not refresh friend list of {}: {}", username, e),
        }
    }

    /// Push a fresh `friend_requests` if `username` is online.
    pub(crate) async fn push_friend_requests(&self, username: &str) {
        if !self.registry().is_online(username).await {
            return;
        }
        match self.friend_requests_of(username).await {
            Ok(requests) => {
                self.registry()
                    .send_to_user(username, ServerFrame::FriendRequests { requests })
                    .await;
            }
            Err(e) => warn!("could not refresh friend requests of {}: {}", username, e),
        }
    }
}
