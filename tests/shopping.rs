mod common;

use common::{fixture, payload};
use foodgram_sdk::{
    actions::{
        add_relation, build_shopping_list, create_recipe, delete_recipe, export_shopping_list,
        remove_relation, ShoppingList,
    },
    schema::RelationKind,
    SHOPPING_LIST_FILE_NAME,
};

#[tokio::test]
async fn flour_from_two_recipes_becomes_one_row() {
    let f = fixture().await;
    let bread = create_recipe(
        f.bob.id,
        payload("Bread", &[], &[(f.flour.id, 200), (f.milk.id, 100)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();
    let cake = create_recipe(
        f.bob.id,
        payload("Cake", &[], &[(f.flour.id, 100), (f.sugar.id, 50)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();

    for recipe in [bread.id, cake.id] {
        add_relation(RelationKind::CartItem, f.alice.id, recipe, &f.store)
            .await
            .unwrap();
    }

    let rows = match build_shopping_list(f.alice.id, &f.store).await.unwrap() {
        ShoppingList::Rows(rows) => rows,
        ShoppingList::NoContent => panic!("cart is not empty"),
    };

    let flour: Vec<_> = rows.iter().filter(|r| r.name == "flour").collect();
    assert_eq!(flour.len(), 1);
    assert_eq!(flour[0].amount, 300);
    assert_eq!(flour[0].measurement_unit, "g");

    let names: Vec<_> = rows.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["flour", "milk", "sugar"]);
    let positions: Vec<_> = rows.iter().map(|r| r.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn empty_cart_is_no_content() {
    let f = fixture().await;
    assert_eq!(
        build_shopping_list(f.alice.id, &f.store).await.unwrap(),
        ShoppingList::NoContent
    );
    assert!(export_shopping_list(f.alice.id, &f.store)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn cart_emptied_by_removal_or_deletion_is_no_content() {
    let f = fixture().await;
    let bread = create_recipe(
        f.bob.id,
        payload("Bread", &[], &[(f.flour.id, 200)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();
    let cake = create_recipe(
        f.bob.id,
        payload("Cake", &[], &[(f.sugar.id, 200)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();
    add_relation(RelationKind::CartItem, f.alice.id, bread.id, &f.store)
        .await
        .unwrap();
    add_relation(RelationKind::CartItem, f.alice.id, cake.id, &f.store)
        .await
        .unwrap();

    remove_relation(RelationKind::CartItem, f.alice.id, bread.id, &f.store)
        .await
        .unwrap();
    delete_recipe(cake.id, &f.store).await.unwrap();

    assert_eq!(
        build_shopping_list(f.alice.id, &f.store).await.unwrap(),
        ShoppingList::NoContent
    );
}

#[tokio::test]
async fn export_renders_the_table() {
    let f = fixture().await;
    let bread = create_recipe(
        f.bob.id,
        payload("Bread", &[], &[(f.flour.id, 200)]),
        &f.actions,
        &f.store,
    )
    .await
    .unwrap();
    add_relation(RelationKind::CartItem, f.alice.id, bread.id, &f.store)
        .await
        .unwrap();

    let export = export_shopping_list(f.alice.id, &f.store)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(export.file_name, SHOPPING_LIST_FILE_NAME);
    assert_eq!(
        export.body,
        "| No. | Name  | Amount | Unit |\n\
         |-----|-------|--------|------|\n\
         |   1 | flour |    200 | g    |\n"
    );
}
