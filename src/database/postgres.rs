use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgConnection, Pool, Postgres, QueryBuilder};

use crate::{
    config::Config,
    error::{CoreError, ErrorKind},
    schema::{
        CartLine, Id, Ingredient, IngredientAmount, NewIngredient, NewTag, NewUser, Recipe,
        RelationKind, Tag, User,
    },
    store::{first_missing, EntityStore, RecipeDraft, RecipeFilter},
};

#[derive(Clone)]
pub struct PgStore {
    pool: Pool<Postgres>,
}

impl PgStore {
    pub async fn connect(config: &Config) -> Result<Self, CoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .connect(&config.database_url)
            .await?;
        log::info!(
            "Connected to database with up to {} connections",
            config.database_max_connections
        );
        Ok(Self { pool })
    }

    pub fn from_pool(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool<Postgres> {
        &self.pool
    }

    pub async fn migrate(&self) -> Result<(), CoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| CoreError::storage(format!("Could not run migrations: {e}")))?;
        Ok(())
    }
}

/// Escapes LIKE wildcards so the prefix is matched literally.
fn like_prefix(prefix: &str) -> String {
    let mut pattern = String::with_capacity(prefix.len() + 1);
    for c in prefix.to_lowercase().chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn build_recipe_query(filter: &RecipeFilter, viewer: Option<Id>) -> QueryBuilder<'static, Postgres> {
    let mut query: QueryBuilder<Postgres> = QueryBuilder::new("SELECT r.* FROM recipes r WHERE TRUE");

    if let Some(author) = filter.author {
        query.push(" AND r.author_id = ").push_bind(author);
    }

    if !filter.tags.is_empty() {
        query
            .push(
                " AND EXISTS (SELECT 1 FROM recipe_tags rt INNER JOIN tags t ON t.id = rt.tag_id \
                 WHERE rt.recipe_id = r.id AND t.slug = ANY(",
            )
            .push_bind(filter.tags.clone())
            .push("))");
    }

    // Relation filters only make sense for a known viewer.
    if let Some(user) = viewer {
        for (wanted, kind) in [
            (filter.is_favorited, RelationKind::Favorite),
            (filter.is_in_shopping_cart, RelationKind::CartItem),
        ] {
            if let Some(wanted) = wanted {
                let negation = if wanted { "" } else { " NOT" };
                query
                    .push(format!(
                        " AND{negation} EXISTS (SELECT 1 FROM {} x WHERE x.recipe_id = r.id AND x.user_id = ",
                        kind.table()
                    ))
                    .push_bind(user)
                    .push(")");
            }
        }
    }

    query.push(" ORDER BY r.pub_date DESC, r.id DESC");
    query
}

async fn ensure_references(conn: &mut PgConnection, draft: &RecipeDraft) -> Result<(), CoreError> {
    if !draft.tag_ids.is_empty() {
        let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM tags WHERE id = ANY($1)")
            .bind(&draft.tag_ids)
            .fetch_all(&mut *conn)
            .await?;
        let found: Vec<Id> = found.into_iter().map(|(id,)| id).collect();

        if let Some(id) = first_missing(&draft.tag_ids, &found) {
            return Err(CoreError::new(
                ErrorKind::NotFound,
                format!("Tag {id} doesn't exist"),
            ));
        }
    }

    let requested: Vec<Id> = draft.lines.iter().map(|line| line.id).collect();
    let found: Vec<(Id,)> = sqlx::query_as("SELECT id FROM ingredients WHERE id = ANY($1)")
        .bind(&requested)
        .fetch_all(&mut *conn)
        .await?;
    let found: Vec<Id> = found.into_iter().map(|(id,)| id).collect();

    if let Some(id) = first_missing(&requested, &found) {
        return Err(CoreError::new(
            ErrorKind::NotFound,
            format!("Ingredient {id} doesn't exist"),
        ));
    }
    Ok(())
}

/// Replaces the tag set and ingredient-line set of a recipe.
async fn write_children(
    conn: &mut PgConnection,
    recipe_id: Id,
    draft: &RecipeDraft,
) -> Result<(), CoreError> {
    sqlx::query("DELETE FROM recipe_tags WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    sqlx::query("DELETE FROM ingredient_lines WHERE recipe_id = $1")
        .bind(recipe_id)
        .execute(&mut *conn)
        .await?;

    if !draft.tag_ids.is_empty() {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO recipe_tags (recipe_id, tag_id) ");
        query_builder.push_values(draft.tag_ids.iter(), |mut b, tag_id| {
            b.push_bind(recipe_id).push_bind(*tag_id);
        });
        query_builder.build().execute(&mut *conn).await?;
    }

    let mut query_builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO ingredient_lines (recipe_id, ingredient_id, amount) ");
    query_builder.push_values(draft.lines.iter(), |mut b, line| {
        b.push_bind(recipe_id)
            .push_bind(line.id)
            .push_bind(line.amount);
    });
    query_builder.build().execute(&mut *conn).await?;

    Ok(())
}

#[async_trait]
impl EntityStore for PgStore {
    async fn insert_user(&self, user: &NewUser, password_hash: &str) -> Result<User, CoreError> {
        let row: User = sqlx::query_as(
            "
            INSERT INTO users (email, username, first_name, last_name, password)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    async fn get_user(&self, id: Id) -> Result<Option<User>, CoreError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, CoreError> {
        let row: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn insert_tags(&self, tags: &[NewTag]) -> Result<Vec<Tag>, CoreError> {
        if tags.is_empty() {
            return Ok(vec![]);
        }

        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::storage("Could not start transaction".to_owned()))?;

        let mut created = Vec::with_capacity(tags.len());
        for chunk in tags.chunks(65535 / 3) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO tags (name, color, slug) ");
            query_builder.push_values(chunk.iter(), |mut b, tag| {
                b.push_bind(tag.name.to_owned())
                    .push_bind(tag.color.to_owned())
                    .push_bind(tag.slug.to_owned());
            });
            query_builder.push(" RETURNING *");

            let rows: Vec<Tag> = query_builder
                .build_query_as()
                .fetch_all(&mut *tr)
                .await?;
            created.extend(rows);
        }

        tr.commit()
            .await
            .map_err(|_| CoreError::storage("Could not commit transaction".to_owned()))?;

        Ok(created)
    }

    async fn get_tag(&self, id: Id) -> Result<Option<Tag>, CoreError> {
        let row: Option<Tag> = sqlx::query_as("SELECT * FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_tags(&self) -> Result<Vec<Tag>, CoreError> {
        let rows: Vec<Tag> = sqlx::query_as("SELECT * FROM tags ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(rows)
    }

    async fn insert_ingredients(
        &self,
        ingredients: &[NewIngredient],
    ) -> Result<Vec<Ingredient>, CoreError> {
        if ingredients.is_empty() {
            return Ok(vec![]);
        }

        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::storage("Could not start transaction".to_owned()))?;

        let mut created = Vec::with_capacity(ingredients.len());
        for chunk in ingredients.chunks(65535 / 2) {
            let mut query_builder: QueryBuilder<Postgres> =
                QueryBuilder::new("INSERT INTO ingredients (name, measurement_unit) ");
            query_builder.push_values(chunk.iter(), |mut b, ingredient| {
                b.push_bind(ingredient.name.to_owned())
                    .push_bind(ingredient.measurement_unit.to_owned());
            });
            query_builder.push(" RETURNING *");

            let rows: Vec<Ingredient> = query_builder
                .build_query_as()
                .fetch_all(&mut *tr)
                .await?;
            created.extend(rows);
        }

        tr.commit()
            .await
            .map_err(|_| CoreError::storage("Could not commit transaction".to_owned()))?;

        Ok(created)
    }

    async fn get_ingredient(&self, id: Id) -> Result<Option<Ingredient>, CoreError> {
        let row: Option<Ingredient> = sqlx::query_as("SELECT * FROM ingredients WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn search_ingredients(&self, prefix: Option<&str>) -> Result<Vec<Ingredient>, CoreError> {
        let rows: Vec<Ingredient> = match prefix {
            Some(prefix) => {
                sqlx::query_as(
                    "SELECT * FROM ingredients WHERE LOWER(name) LIKE $1 ORDER BY name, id",
                )
                .bind(like_prefix(prefix))
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT * FROM ingredients ORDER BY name, id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(rows)
    }

    async fn insert_recipe(&self, author_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::storage("Could not start transaction".to_owned()))?;

        ensure_references(&mut *tr, draft).await?;

        let recipe: Recipe = sqlx::query_as(
            "
            INSERT INTO recipes (author_id, name, image, text, cooking_time)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
        ",
        )
        .bind(author_id)
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .fetch_one(&mut *tr)
        .await?;

        write_children(&mut *tr, recipe.id, draft).await?;

        tr.commit()
            .await
            .map_err(|_| CoreError::storage("Could not commit transaction".to_owned()))?;

        Ok(recipe)
    }

    async fn replace_recipe(&self, recipe_id: Id, draft: &RecipeDraft) -> Result<Recipe, CoreError> {
        let mut tr = self
            .pool
            .begin()
            .await
            .map_err(|_| CoreError::storage("Could not start transaction".to_owned()))?;

        ensure_references(&mut *tr, draft).await?;

        let recipe: Option<Recipe> = sqlx::query_as(
            "
            UPDATE recipes SET name = $2, image = $3, text = $4, cooking_time = $5
            WHERE id = $1
            RETURNING *
        ",
        )
        .bind(recipe_id)
        .bind(&draft.name)
        .bind(&draft.image)
        .bind(&draft.text)
        .bind(draft.cooking_time)
        .fetch_optional(&mut *tr)
        .await?;

        let recipe = match recipe {
            Some(recipe) => recipe,
            None => return Err(ErrorKind::NotFound.new("No recipe exists with specified id")),
        };

        write_children(&mut *tr, recipe_id, draft).await?;

        tr.commit()
            .await
            .map_err(|_| CoreError::storage("Could not commit transaction".to_owned()))?;

        Ok(recipe)
    }

    async fn delete_recipe(&self, recipe_id: Id) -> Result<bool, CoreError> {
        // Lines, tag links, favorites and cart items go with the row.
        let result = sqlx::query("DELETE FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_recipe(&self, recipe_id: Id) -> Result<Option<Recipe>, CoreError> {
        let row: Option<Recipe> = sqlx::query_as("SELECT * FROM recipes WHERE id = $1")
            .bind(recipe_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn list_recipes(
        &self,
        filter: &RecipeFilter,
        viewer: Option<Id>,
    ) -> Result<Vec<Recipe>, CoreError> {
        let mut query = build_recipe_query(filter, viewer);
        let rows: Vec<Recipe> = query.build_query_as().fetch_all(&self.pool).await?;

        Ok(rows)
    }

    async fn list_author_recipes(
        &self,
        author_id: Id,
        limit: Option<i64>,
    ) -> Result<Vec<Recipe>, CoreError> {
        let rows: Vec<Recipe> = sqlx::query_as(
            "SELECT * FROM recipes WHERE author_id = $1 ORDER BY pub_date DESC, id DESC LIMIT $2",
        )
        .bind(author_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn count_author_recipes(&self, author_id: Id) -> Result<i64, CoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM recipes WHERE author_id = $1")
            .bind(author_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(row.0)
    }

    async fn list_recipe_tags(&self, recipe_id: Id) -> Result<Vec<Tag>, CoreError> {
        let rows: Vec<Tag> = sqlx::query_as(
            "
            SELECT t.* FROM tags t
            INNER JOIN recipe_tags rt ON rt.tag_id = t.id
            WHERE rt.recipe_id = $1
            ORDER BY t.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn list_recipe_ingredients(
        &self,
        recipe_id: Id,
    ) -> Result<Vec<IngredientAmount>, CoreError> {
        let rows: Vec<IngredientAmount> = sqlx::query_as(
            "
            SELECT i.id AS id, i.name AS name, i.measurement_unit AS measurement_unit, l.amount AS amount
            FROM ingredient_lines l
            INNER JOIN ingredients i ON i.id = l.ingredient_id
            WHERE l.recipe_id = $1
            ORDER BY l.id
        ",
        )
        .bind(recipe_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn relation_exists(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        let row: (bool,) = sqlx::query_as(&format!(
            "SELECT EXISTS (SELECT 1 FROM {} WHERE user_id = $1 AND {} = $2)",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.0)
    }

    async fn insert_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        // The unique constraint decides races; a losing insert affects no rows.
        let result = sqlx::query(&format!(
            "INSERT INTO {} (user_id, {}) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_relation(
        &self,
        kind: RelationKind,
        user_id: Id,
        target_id: Id,
    ) -> Result<bool, CoreError> {
        let result = sqlx::query(&format!(
            "DELETE FROM {} WHERE user_id = $1 AND {} = $2",
            kind.table(),
            kind.target_column()
        ))
        .bind(user_id)
        .bind(target_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_relation_targets(
        &self,
        kind: RelationKind,
        user_id: Id,
    ) -> Result<Vec<Id>, CoreError> {
        let rows: Vec<(Id,)> = sqlx::query_as(&format!(
            "SELECT {} FROM {} WHERE user_id = $1 ORDER BY id",
            kind.target_column(),
            kind.table()
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    async fn list_cart_lines(&self, user_id: Id) -> Result<Vec<CartLine>, CoreError> {
        let rows: Vec<CartLine> = sqlx::query_as(
            "
            SELECT i.name AS name, i.measurement_unit AS measurement_unit, l.amount AS amount
            FROM cart_items c
            INNER JOIN ingredient_lines l ON l.recipe_id = c.recipe_id
            INNER JOIN ingredients i ON i.id = l.ingredient_id
            WHERE c.user_id = $1
        ",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
