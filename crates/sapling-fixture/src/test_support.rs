//! Shared fixture definitions for in-crate tests.

use crate::factory::{BuildContext, FixtureDefinition};
use sapling_core::{entity_kind, error::Error, slot::KeySlot};
use serde::{Deserialize, Serialize};

///
/// User
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct User {
    pub key: KeySlot,
    pub handle: String,
}

entity_kind!(User, kind = "User", key = key);

#[derive(Debug)]
pub(crate) struct UserFixture;

impl FixtureDefinition for UserFixture {
    type Entity = User;

    fn populate(ctx: &BuildContext<'_>) -> Result<User, Error> {
        Ok(User {
            key: ctx.key(),
            handle: format!("user-{}", ctx.sequence()),
        })
    }
}

///
/// Team
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Team {
    pub key: KeySlot,
    pub name: String,
}

entity_kind!(Team, kind = "Team", key = key);

#[derive(Debug)]
pub(crate) struct TeamFixture;

impl FixtureDefinition for TeamFixture {
    type Entity = Team;

    fn populate(ctx: &BuildContext<'_>) -> Result<Team, Error> {
        Ok(Team {
            key: ctx.key(),
            name: format!("team-{}", ctx.sequence()),
        })
    }
}

///
/// Post
/// References a User through a deferred slot.
///

#[derive(Clone, Debug, Deserialize, Serialize)]
pub(crate) struct Post {
    pub key: KeySlot,
    pub title: String,
    pub author: KeySlot,
}

entity_kind!(Post, kind = "Post", key = key, references = [author]);

#[derive(Debug)]
pub(crate) struct PostFixture;

impl FixtureDefinition for PostFixture {
    type Entity = Post;

    fn populate(ctx: &BuildContext<'_>) -> Result<Post, Error> {
        Ok(Post {
            key: ctx.key(),
            title: format!("post-{}", ctx.sequence()),
            author: ctx.reference::<UserFixture>()?,
        })
    }
}
