use crate::{
    actions::users::user_view,
    error::{CoreError, ErrorKind},
    schema::{AuthorView, Id, RecipeShort, Relation, RelationKind, RelationView, User},
    store::EntityStore,
};

/// Creates the (user, kind, target) relation.
///
/// Fails with `SelfReference` when a user follows themself, `NotFound` when the
/// target is missing and `AlreadyExists` when the pair is already present. The
/// existence pre-check only produces the nicer message; the store's insert
/// decides concurrent adds.
pub async fn add_relation(
    kind: RelationKind,
    user_id: Id,
    target_id: Id,
    store: &impl EntityStore,
) -> Result<Relation, CoreError> {
    if kind.targets_user() && user_id == target_id {
        log::warn!("User {user_id} tried to subscribe to themself");
        return Err(ErrorKind::SelfReference.new("You can't subscribe to yourself"));
    }

    let target_exists = if kind.targets_user() {
        store.get_user(target_id).await?.is_some()
    } else {
        store.get_recipe(target_id).await?.is_some()
    };
    if !target_exists {
        return Err(match kind.targets_user() {
            true => ErrorKind::NotFound.new("No user exists with specified id"),
            false => ErrorKind::NotFound.new("No recipe exists with specified id"),
        });
    }

    if store.relation_exists(kind, user_id, target_id).await? {
        return Err(ErrorKind::AlreadyExists.new(kind.already_exists_message()));
    }

    if !store.insert_relation(kind, user_id, target_id).await? {
        log::warn!("Lost a concurrent {kind:?} add for ({user_id}, {target_id})");
        return Err(ErrorKind::AlreadyExists.new(kind.already_exists_message()));
    }

    log::info!("Added {kind:?} relation ({user_id}, {target_id})");
    Ok(Relation {
        kind,
        user_id,
        target_id,
    })
}

pub async fn remove_relation(
    kind: RelationKind,
    user_id: Id,
    target_id: Id,
    store: &impl EntityStore,
) -> Result<(), CoreError> {
    if !store.delete_relation(kind, user_id, target_id).await? {
        return Err(ErrorKind::NotFound.new(kind.missing_message()));
    }

    log::info!("Removed {kind:?} relation ({user_id}, {target_id})");
    Ok(())
}

/// The follower-facing view of an author: profile, newest recipes and recipe count.
pub async fn author_view(
    author: User,
    viewer: Id,
    recipes_limit: Option<i64>,
    store: &impl EntityStore,
) -> Result<AuthorView, CoreError> {
    if recipes_limit.is_some_and(|limit| limit < 0) {
        return Err(ErrorKind::Validation.new("recipes_limit may not be negative"));
    }

    let recipes = store.list_author_recipes(author.id, recipes_limit).await?;
    let recipes_count = store.count_author_recipes(author.id).await?;
    let user = user_view(author, Some(viewer), store).await?;

    Ok(AuthorView {
        user,
        recipes: recipes.iter().map(RecipeShort::from).collect(),
        recipes_count,
    })
}

/// Renders a freshly added relation the way clients display it.
pub async fn present_relation(
    relation: &Relation,
    recipes_limit: Option<i64>,
    store: &impl EntityStore,
) -> Result<RelationView, CoreError> {
    if relation.kind.targets_user() {
        let author = store
            .get_user(relation.target_id)
            .await?
            .ok_or_else(|| ErrorKind::NotFound.new("No user exists with specified id"))?;

        let view = author_view(author, relation.user_id, recipes_limit, store).await?;
        return Ok(RelationView::Author(view));
    }

    let recipe = store
        .get_recipe(relation.target_id)
        .await?
        .ok_or_else(|| ErrorKind::NotFound.new("No recipe exists with specified id"))?;
    Ok(RelationView::Recipe(RecipeShort::from(&recipe)))
}

pub async fn list_subscriptions(
    user_id: Id,
    recipes_limit: Option<i64>,
    store: &impl EntityStore,
) -> Result<Vec<AuthorView>, CoreError> {
    let following = store
        .list_relation_targets(RelationKind::Follow, user_id)
        .await?;

    let mut authors = Vec::with_capacity(following.len());
    for author_id in following {
        // An author deleted between the two reads simply drops out.
        if let Some(author) = store.get_user(author_id).await? {
            authors.push(author_view(author, user_id, recipes_limit, store).await?);
        }
    }

    log::trace!("User {user_id} follows {} authors", authors.len());
    Ok(authors)
}
