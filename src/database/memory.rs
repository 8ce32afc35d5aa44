use std::{
    collections::{BTreeMap, BTreeSet},
    sync::Mutex,
};

use async_trait::async_trait;
use chrono::Utc;

use crate::{
    error::{CoreError, ErrorKind},
    schema::{
        CartLine, Id, Ingredient, IngredientAmount, IngredientLine, NewIngredient, NewTag,
        NewUser, Recipe, RelationKind, Tag, User, UserRole,
    },
    store::{first_missing, EntityStore, RecipeDraft, RecipeFilter},
};

#[derive(Default)]
struct Tables {
    sequence: Id,
    users: BTreeMap<Id, User>,
    ingredients: BTreeMap<Id, Ingredient>,
    tags: BTreeMap<Id, Tag>,
    recipes: BTreeMap<Id, Recipe>,
    lines: BTreeMap<Id, IngredientLine>,
    recipe_tags: BTreeSet<(Id, Id)>,
    relations: BTreeSet<(RelationKind, Id, Id)>,
}

impl Tables {
    fn next_id(&mut self) -> Id {
        self.sequence += 1;
        self.sequence
    }

    fn ensure_references(&self, draft: &RecipeDraft) -> Result<(), CoreError> {
        let tags: Vec<Id> = self.tags.keys().copied().collect();
        if let Some(id) = first_missing(&draft.tag_ids, &tags) {
            return Err(CoreError::new(
                ErrorKind::NotFound,
                format!("Tag {id} doesn't exist"),
            ));
        }

        let requested: Vec<Id> = draft.lines.iter().map(|line| line.id).collect();
        let ingredients: Vec<Id> = self.ingredients.keys().copied().collect();
        if let Some(id) = first_missing(&requested, &ingredients) {
            return Err(CoreError::new(
                ErrorKind::NotFound,
                format!("Ingredient {id} doesn't exist"),
            ));
        }
        Ok(())
    }

    fn write_children(&mut self, recipe_id: Id, draft: &RecipeDraft) {
        self.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
        self.lines.retain(|_, line| line.recipe_id != recipe_id);

        for tag_id in draft.tag_ids.iter() {
            self.recipe_tags.insert((recipe_id, *tag_id));
        }
        for line in draft.lines.iter() {
            let id = self.next_id();
            self.lines.insert(
                id,
                IngredientLine {
                    id,
                    recipe_id,
                    ingredient_id: line.id,
                    amount: line.amount,
                },
            );
        }
    }

    fn target_exists(&self, kind: RelationKind, target_id: Id) -> bool {
        if kind.targets_user() {
            self.users.contains_key(&target_id)
        } else {
            self.recipes.contains_key(&target_id)
        }
    }

    fn related(&self, kind: RelationKind, user_id: Id, target_id: Id) -> bool {
        self.relations.contains(&(kind, user_id, target_id))
    }

    fn newest_first(mut recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.sort_by(|a, b| b.pub_date.cmp(&a.pub_date).then(b.id.cmp(&a.id)));
        recipes
    }
}

/// In-process store. Every unit of work runs under one lock and checks all of
/// its preconditions before the first write, so a failed operation leaves the
/// tables untouched.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_tables<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let mut tables = self
            .tables
            .lock()
            .map_err(|_| CoreError::storage("Memory store lock poisoned".to_owned()))?;
        f(&mut tables)
    }

    /// Grants the admin role; there is no public operation for it.
    pub fn promote_admin(&self, user_id: Id) -> Result<(), CoreError> {
        self.with_tables(|t| match t.users.get_mut(&user_id) {
            Some(user) => {
                user.role = UserRole::Admin;
                Ok(())
            }
            None => Err(ErrorKind::NotFound.new("User doesn't exist")),
        })
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn insert_user(&self, user: &NewUser, password_hash: &str) -> Result<User, CoreError> {
        self.with_tables(|t| {
            if t.users.values().any(|u| u.email == user.email) {
                return Err(ErrorKind::AlreadyExists.new("User with this email already exists"));
            }
            if t.users.values().any(|u| u.username == user.username) {
                return Err(
                    ErrorKind::AlreadyExists.new("User with this username already exists")
                );
            }
            let id = t.next_id();
            let row = User {
                id,
                email: user.email.to_owned(),
                username: user.username.to_owned(),
                first_name: user.first_name.to_owned(),
                last_name: user.last_name.to_owned(),
                password: password_hash.to_owned(),
                role: UserRole::User,
            };
            t.users.insert(id, row.clone());
            Ok(row)
        })
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, CoreError> {
        self.with_tables(|t| Ok(t.users.get(&id).cloned()))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        self.with_tables(|t| Ok(t.users.values().find(|u| u.email == email).cloned()))
    }

    async fn insert_tags(&self, tags: &[NewTag]) -> Result<Vec<Tag>, CoreError> {
        self.with_tables(|t| {
            let mut slugs: BTreeSet<&str> = t.tags.values().map(|tag| tag.slug.as_str()).collect();
            for tag in tags.iter() {
                if !slugs.insert(tag.slug.as_str()) {
                    return Err(ErrorKind::AlreadyExists.new("Tag with this slug already exists"));
                }
            }

            let mut created = Vec::with_capacity(tags.len());
            for tag in tags.iter() {
                let id = t.next_id();
                let row = Tag {
                    id,
                    name: tag.name.to_owned(),
                    color: tag.color.to_owned(),
                    slug: tag.slug.to_owned(),
                };
                t.tags.insert(id, row.clone());
                created.push(row);
            }
            Ok(created)
        })
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, CoreError> {
        self.with_tables(|t| Ok(t.tags.get(&id).cloned()))
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, CoreError> {
        self.with_tables(|t| Ok(t.tags.values().cloned().collect()))
    }

    async fn insert_ingredients(
        &self,
        ingredients: &[NewIngredient],
    ) -> Result<Vec<Ingredient>, CoreError> {
        self.with_tables(|t| {
            if ingredients.iter().any(|i| i.name.is_empty()) {
                return Err(ErrorKind::Validation.new("name may not be blank"));
            }
            let mut created = Vec::with_capacity(ingredients.len());
            for ingredient in ingredients.iter() {
                let id = t.next_id();
                let row = Ingredient {
                    id,
                    name: ingredient.name.to_owned(),
                    measurement_unit: ingredient.measurement_unit.to_owned(),
                };
                t.ingredients.insert(id, row.clone());
                created.push(row);
            }
            Ok(created)
        })
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, CoreError> {
        self.with_tables(|t| Ok(t.ingredients.get(&id).cloned()))
    }

    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, CoreError> {
        let prefix = prefix.map(|p| p.to_lowercase());
        self.with_tables(|t| {
            let mut found: Vec<Ingredient> = t
                .ingredients
                .values()
                .filter(|i| match &prefix {
                    Some(prefix) => i.name.to_lowercase().starts_with(prefix.as_str()),
                    None => true,
                })
                .cloned()
                .collect();
            found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
            Ok(found)
        })
    }

    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError> {
        self.with_tables(|t| {
            if !t.users.contains_key(&author_id) {
                return Err(ErrorKind::NotFound.new("Author doesn't exist"));
            }
            t.ensure_references(draft)?;

            let id = t.next_id();
            let recipe = Recipe {
                id,
                author_id,
                name: draft.name.to_owned(),
                image: draft.image.to_owned(),
                text: draft.text.to_owned(),
                cooking_time: draft.cooking_time,
                pub_date: Utc::now(),
            };
            t.recipes.insert(id, recipe.clone());
            t.write_children(id, draft);
            Ok(recipe)
        })
    }

    async fn replace_recipe(&self, recipe_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError> {
        self.with_tables(|t| {
            if !t.recipes.contains_key(&recipe_id) {
                return Err(ErrorKind::NotFound.new("No recipe exists with specified id"));
            }
            t.ensure_references(draft)?;

            let recipe = match t.recipes.get_mut(&recipe_id) {
                Some(recipe) => {
                    recipe.name = draft.name.to_owned();
                    recipe.image = draft.image.to_owned();
                    recipe.text = draft.text.to_owned();
                    recipe.cooking_time = draft.cooking_time;
                    recipe.clone()
                }
                None => return Err(ErrorKind::NotFound.new("No recipe exists with specified id")),
            };
            t.write_children(recipe_id, draft);
            Ok(recipe)
        })
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, CoreError> {
        self.with_tables(|t| {
            if t.recipes.remove(&recipe_id).is_none() {
                return Ok(false);
            }
            t.lines.retain(|_, line| line.recipe_id != recipe_id);
            t.recipe_tags.retain(|(recipe, _)| *recipe != recipe_id);
            t.relations
                .retain(|(kind, _, target)| kind.targets_user() || *target != recipe_id);
            Ok(true)
        })
    }

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, CoreError> {
        self.with_tables(|t| Ok(t.recipes.get(&recipe_id).cloned()))
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<Vec<Recipe>, CoreError> {
        self.with_tables(|t| {
            let tag_ids: Vec<Id> = t
                .tags
                .values()
                .filter(|tag| filter.tags.contains(&tag.slug))
                .map(|tag| tag.id)
                .collect();

            let recipes = t
                .recipes
                .values()
                .filter(|r| filter.author.map_or(true, |author| r.author_id == author))
                .filter(|r| {
                    filter.tags.is_empty()
                        || tag_ids
                            .iter()
                            .any(|tag| t.recipe_tags.contains(&(r.id, *tag)))
                })
                .filter(|r| match (viewer, filter.is_favorited) {
                    (Some(user), Some(wanted)) => {
                        t.related(RelationKind::Favorite, user, r.id) == wanted
                    }
                    _ => true,
                })
                .filter(|r| match (viewer, filter.is_in_shopping_cart) {
                    (Some(user), Some(wanted)) => {
                        t.related(RelationKind::CartItem, user, r.id) == wanted
                    }
                    _ => true,
                })
                .cloned()
                .collect();
            Ok(Tables::newest_first(recipes))
        })
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, CoreError> {
        self.with_tables(|t| {
            let recipes = t
                .recipes
                .values()
                .filter(|r| r.author_id == author_id)
                .cloned()
                .collect();
            let mut recipes = Tables::newest_first(recipes);
            if let Some(limit) = limit {
                recipes.truncate(limit.max(0) as usize);
            }
            Ok(recipes)
        })
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, CoreError> {
        self.with_tables(|t| {
            Ok(t.recipes.values().filter(|r| r.author_id == author_id).count() as i64)
        })
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError> {
        self.with_tables(|t| {
            Ok(t.recipe_tags
                .iter()
                .filter(|(recipe, _)| *recipe == recipe_id)
                .filter_map(|(_, tag)| t.tags.get(tag).cloned())
                .collect())
        })
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<IngredientAmount>, CoreError> {
        self.with_tables(|t| {
            Ok(t.lines
                .values()
                .filter(|line| line.recipe_id == recipe_id)
                .filter_map(|line| {
                    t.ingredients.get(&line.ingredient_id).map(|i| IngredientAmount {
                        id: i.id,
                        name: i.name.to_owned(),
                        measurement_unit: i.measurement_unit.to_owned(),
                        amount: line.amount,
                    })
                })
                .collect())
        })
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        self.with_tables(|t| Ok(t.related(kind, user_id, target_id)))
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        self.with_tables(|t| {
            if kind.targets_user() && user_id == target_id {
                return Err(ErrorKind::SelfReference.new("You can't subscribe to yourself"));
            }
            if !t.users.contains_key(&user_id) || !t.target_exists(kind, target_id) {
                return Err(ErrorKind::NotFound.new("Relation target doesn't exist"));
            }
            Ok(t.relations.insert((kind, user_id, target_id)))
        })
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        self.with_tables(|t| Ok(t.relations.remove(&(kind, user_id, target_id))))
    }

    async fn list_relation_targets(
        &self,
        kind: RelationKind,
        user_id: Id,
    ) -> Result<Vec<Id>, CoreError> {
        self.with_tables(|t| {
            Ok(t.relations
                .iter()
                .filter(|(k, user, _)| *k == kind && *user == user_id)
                .map(|(_, _, target)| *target)
                .collect())
        })
    }

    async fn list_cart_lines(&self, user_id: Id) -> Result<Vec<CartLine>, CoreError> {
        self.with_tables(|t| {
            let cart: BTreeSet<Id> = t
                .relations
                .iter()
                .filter(|(kind, user, _)| *kind == RelationKind::CartItem && *user == user_id)
                .map(|(_, _, recipe)| *recipe)
                .collect();

            Ok(t.lines
                .values()
                .filter(|line| cart.contains(&line.recipe_id))
                .filter_map(|line| {
                    t.ingredients.get(&line.ingredient_id).map(|i| CartLine {
                        name: i.name.to_owned(),
                        measurement_unit: i.measurement_unit.to_owned(),
                        amount: line.amount,
                    })
                })
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::IngredientAmountInput;

    async fn seeded() -> (MemoryStore, Id, Vec<Ingredient>, Vec<Tag>) {
        let store = MemoryStore::new();
        let user = store
            .insert_user(
                &NewUser {
                    email: "cook@example.com".to_owned(),
                    username: "cook".to_owned(),
                    first_name: "Ann".to_owned(),
                    last_name: "Cook".to_owned(),
                    password: "pw".to_owned(),
                },
                "hash",
            )
            .await
            .unwrap();
        let ingredients = store
            .insert_ingredients(&[
                NewIngredient {
                    name: "flour".to_owned(),
                    measurement_unit: "g".to_owned(),
                },
                NewIngredient {
                    name: "milk".to_owned(),
                    measurement_unit: "ml".to_owned(),
                },
            ])
            .await
            .unwrap();
        let tags = store
            .insert_tags(&[NewTag {
                name: "Breakfast".to_owned(),
                color: "#ffaa00".to_owned(),
                slug: "breakfast".to_owned(),
            }])
            .await
            .unwrap();
        (store, user.id, ingredients, tags)
    }

    fn draft(tag_ids: Vec<Id>, lines: Vec<(Id, i32)>) -> RecipeDraft {
        RecipeDraft {
            name: "Pancakes".to_owned(),
            image: "recipes/a.png".to_owned(),
            text: "Fry".to_owned(),
            cooking_time: 10,
            tag_ids,
            lines: lines.into_iter().map(IngredientAmountInput::from).collect(),
        }
    }

    #[tokio::test]
    async fn failed_insert_leaves_no_orphan_recipe() {
        let (store, user, ingredients, _) = seeded().await;
        let error = store
            .insert_recipe(user, &draft(vec![999], vec![(ingredients[0].id, 1)]))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);
        assert!(store.list_author_recipes(user, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_replace_keeps_previous_children() {
        let (store, user, ingredients, tags) = seeded().await;
        let recipe = store
            .insert_recipe(user, &draft(vec![tags[0].id], vec![(ingredients[0].id, 5)]))
            .await
            .unwrap();

        let error = store
            .replace_recipe(recipe.id, &draft(vec![], vec![(12345, 1)]))
            .await
            .unwrap_err();
        assert_eq!(error.kind(), ErrorKind::NotFound);

        let lines = store.list_recipe_ingredients(recipe.id).await.unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].amount, 5);
        assert_eq!(store.list_recipe_tags(recipe.id).await.unwrap(), tags);
    }

    #[tokio::test]
    async fn deleting_a_recipe_cascades_relations() {
        let (store, user, ingredients, _) = seeded().await;
        let recipe = store
            .insert_recipe(user, &draft(vec![], vec![(ingredients[1].id, 5)]))
            .await
            .unwrap();
        assert!(store
            .insert_relation(RelationKind::CartItem, user, recipe.id)
            .await
            .unwrap());

        assert!(store.delete_recipe(recipe.id).await.unwrap());
        assert!(store.list_cart_lines(user).await.unwrap().is_empty());
        assert!(!store
            .relation_exists(RelationKind::CartItem, user, recipe.id)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn duplicate_slug_rejects_the_whole_batch() {
        let (store, _, _, _) = seeded().await;
        let result = store
            .insert_tags(&[
                NewTag {
                    name: "Lunch".to_owned(),
                    color: "#00ff00".to_owned(),
                    slug: "lunch".to_owned(),
                },
                NewTag {
                    name: "Breakfast again".to_owned(),
                    color: "#00ff00".to_owned(),
                    slug: "breakfast".to_owned(),
                },
            ])
            .await;
        assert_eq!(result.unwrap_err().kind(), ErrorKind::AlreadyExists);
        assert_eq!(store.list_tags().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn search_is_case_insensitive_prefix() {
        let (store, _, _, _) = seeded().await;
        let found = store.search_ingredients(Some("FL")).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "flour");
        assert_eq!(store.search_ingredients(None).await.unwrap().len(), 2);
    }
}
