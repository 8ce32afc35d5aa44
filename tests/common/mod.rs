#![allow(dead_code)]

use foodgram_sdk::{
    jwt::SessionData,
    memory::MemoryStore,
    operations::ActionTable,
    schema::{
        Id, Ingredient, IngredientAmountInput, NewIngredient, NewTag, NewUser, RecipePayload, Tag,
        User,
    },
    store::EntityStore,
};

pub struct Fixture {
    pub store: MemoryStore,
    pub actions: ActionTable,
    pub alice: User,
    pub bob: User,
    pub flour: Ingredient,
    pub sugar: Ingredient,
    pub milk: Ingredient,
    pub breakfast: Tag,
    pub dinner: Tag,
}

pub fn new_user(name: &str) -> NewUser {
    NewUser {
        email: format!("{name}@example.com"),
        username: name.to_owned(),
        first_name: name.to_owned(),
        last_name: "Tester".to_owned(),
        password: "secret-password".to_owned(),
    }
}

fn new_ingredient(name: &str, unit: &str) -> NewIngredient {
    NewIngredient {
        name: name.to_owned(),
        measurement_unit: unit.to_owned(),
    }
}

fn new_tag(name: &str, slug: &str) -> NewTag {
    NewTag {
        name: name.to_owned(),
        color: "#49B64E".to_owned(),
        slug: slug.to_owned(),
    }
}

pub async fn fixture() -> Fixture {
    let store = MemoryStore::new();

    let alice = store
        .insert_user(&new_user("alice"), "not-a-real-hash")
        .await
        .unwrap();
    let bob = store
        .insert_user(&new_user("bob"), "not-a-real-hash")
        .await
        .unwrap();

    let mut ingredients = store
        .insert_ingredients(&[
            new_ingredient("flour", "g"),
            new_ingredient("sugar", "g"),
            new_ingredient("milk", "ml"),
        ])
        .await
        .unwrap()
        .into_iter();
    let mut tags = store
        .insert_tags(&[new_tag("Breakfast", "breakfast"), new_tag("Dinner", "dinner")])
        .await
        .unwrap()
        .into_iter();

    Fixture {
        store,
        actions: ActionTable::default(),
        alice,
        bob,
        flour: ingredients.next().unwrap(),
        sugar: ingredients.next().unwrap(),
        milk: ingredients.next().unwrap(),
        breakfast: tags.next().unwrap(),
        dinner: tags.next().unwrap(),
    }
}

pub fn session(user: &User) -> SessionData {
    SessionData {
        user_id: user.id,
        username: user.username.to_owned(),
        role: user.role.to_owned(),
    }
}

pub fn payload(name: &str, tags: &[Id], lines: &[(Id, i32)]) -> RecipePayload {
    RecipePayload {
        name: name.to_owned(),
        image: "recipes/photo.png".to_owned(),
        text: "Mix everything".to_owned(),
        cooking_time: 20,
        tags: tags.to_vec(),
        ingredients: lines
            .iter()
            .copied()
            .map(IngredientAmountInput::from)
            .collect(),
    }
}
