mod common;

use std::sync::Arc;

use common::{fixture, payload};
use foodgram_sdk::{
    actions::{
        add_relation, create_recipe, list_subscriptions, present_relation, remove_relation,
    },
    error::ErrorKind,
    schema::{RelationKind, RelationView},
    store::EntityStore,
};

#[tokio::test]
async fn favorite_toggle_is_exactly_once_each_way() {
    let f = fixture().await;
    let recipe = create_recipe(
        f.bob.id,
        payload("Stew", &[], &[(f.flour.id, 1)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();

    let relation = add_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap();
    assert_eq!(relation.target_id, recipe.id);

    let error = add_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::AlreadyExists);
    assert_eq!(error.info(), "Recipe is already in favorites");

    remove_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap();
    let error = remove_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
    assert_eq!(error.info(), "Recipe is not in favorites");
}

#[tokio::test]
async fn kinds_are_independent() {
    let f = fixture().await;
    let recipe = create_recipe(
        f.bob.id,
        payload("Stew", &[], &[(f.flour.id, 1)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();

    add_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap();
    add_relation(RelationKind::CartItem, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap();

    let error = remove_relation(RelationKind::CartItem, f.bob.id, recipe.id, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.info(), "Recipe is not in the shopping cart");
}

#[tokio::test]
async fn following_yourself_always_fails() {
    let f = fixture().await;

    let error = add_relation(RelationKind::Follow, f.alice.id, f.alice.id, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::SelfReference);

    add_relation(RelationKind::Follow, f.alice.id, f.bob.id, &f.store)
        .await
        .unwrap();
    let error = add_relation(RelationKind::Follow, f.alice.id, f.alice.id, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::SelfReference);
}

#[tokio::test]
async fn missing_targets_are_not_found() {
    let f = fixture().await;

    let error = add_relation(RelationKind::Follow, f.alice.id, 777, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);

    let error = add_relation(RelationKind::CartItem, f.alice.id, 777, &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn concurrent_adds_leave_one_row() {
    let f = fixture().await;
    let recipe = create_recipe(
        f.bob.id,
        payload("Stew", &[], &[(f.flour.id, 1)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();

    let store = Arc::new(f.store);
    let alice = f.alice.id;
    let recipe_id = recipe.id;
    let tasks: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move {
                add_relation(RelationKind::CartItem, alice, recipe_id, &*store).await
            })
        })
        .collect();

    let mut successes = 0;
    let mut duplicates = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => successes += 1,
            Err(e) if e.is(ErrorKind::AlreadyExists) => duplicates += 1,
            Err(e) => panic!("unexpected error {e}"),
        }
    }
    assert_eq!(successes, 1);
    assert_eq!(duplicates, 7);
    assert_eq!(
        store
            .list_relation_targets(RelationKind::CartItem, alice)
            .await
            .unwrap(),
        vec![recipe.id]
    );
}

#[tokio::test]
async fn follow_presents_the_author_with_limited_recipes() {
    let f = fixture().await;
    for name in ["One", "Two", "Three"] {
        create_recipe(
            f.bob.id,
            payload(name, &[], &[(f.flour.id, 1)]),
            &f.actions,
            &f.store,
        )
        .await
        .unwrap();
    }

    let relation = add_relation(RelationKind::Follow, f.alice.id, f.bob.id, &f.store)
        .await
        .unwrap();
    let view = present_relation(&relation, Some(2), &f.store).await.unwrap();

    match view {
        RelationView::Author(author) => {
            assert_eq!(author.user.id, f.bob.id);
            assert!(author.user.is_subscribed);
            assert_eq!(author.recipes.len(), 2);
            assert_eq!(author.recipes_count, 3);
        }
        RelationView::Recipe(_) => panic!("follow should present an author"),
    }

    let subscriptions = list_subscriptions(f.alice.id, None, &f.store).await.unwrap();
    assert_eq!(subscriptions.len(), 1);
    assert_eq!(subscriptions[0].recipes.len(), 3);

    assert!(list_subscriptions(f.bob.id, None, &f.store)
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn favorite_presents_the_short_recipe() {
    let f = fixture().await;
    let recipe = create_recipe(
        f.bob.id,
        payload("Stew", &[], &[(f.flour.id, 1)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();

    let relation = add_relation(RelationKind::Favorite, f.alice.id, recipe.id, &f.store)
        .await
        .unwrap();
    let view = present_relation(&relation, None, &f.store).await.unwrap();

    let json = serde_json::to_value(&view).unwrap();
    assert_eq!(json["id"], recipe.id);
    assert_eq!(json["name"], "Stew");
    assert_eq!(json["cooking_time"], 20);
    assert!(json.get("text").is_none());
}

#[tokio::test]
async fn negative_recipes_limit_is_rejected() {
    let f = fixture().await;
    create_recipe(
        f.bob.id,
        payload("Stew", &[], &[(f.flour.id, 1)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();
    let relation = add_relation(RelationKind::Follow, f.alice.id, f.bob.id, &f.store)
        .await
        .unwrap();

    let error = list_subscriptions(f.alice.id, Some(-1), &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    let error = present_relation(&relation, Some(-1), &f.store)
        .await
        .unwrap_err();
    assert_eq!(error.kind(), ErrorKind::Validation);

    let subscriptions = list_subscriptions(f.alice.id, Some(0), &f.store)
        .await
        .unwrap();
    assert!(subscriptions[0].recipes.is_empty());
    assert_eq!(subscriptions[0].recipes_count, 1);
}
