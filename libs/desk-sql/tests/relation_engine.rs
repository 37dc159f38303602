// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use desk_sql::{
    DetailQuery, JsonObject, ListQuery, Ordering, RelationEngine,
    relation::{RelationDecl, RelationRegistry, helpdesk_registry},
    request::{Pagination, QueryParams, SortSpec},
    schema::SchemaCatalog,
    testing::{MemoryDatastore, MemoryTable, Operation},
};
use serde_json::{Value, json};

fn engine(store: &Arc<MemoryDatastore>, registry: RelationRegistry) -> RelationEngine {
    RelationEngine::new(
        Arc::new(SchemaCatalog::new(store.clone())),
        Arc::new(registry),
    )
}

fn helpdesk_store() -> MemoryDatastore {
    MemoryDatastore::new()
        .with_table(
            MemoryTable::new(
                "users",
                &["id", "name", "email", "password_hash", "department_id"],
            )
            .with_rows([
                json!({"id": 1, "name": "Ada", "email": "ada@example.com", "password_hash": "h1", "department_id": 1}),
                json!({"id": 2, "name": "Grace", "email": "grace@example.com", "password_hash": "h2", "department_id": null}),
            ]),
        )
        .with_table(
            MemoryTable::new("departments", &["id", "name"])
                .with_row(json!({"id": 1, "name": "Support"})),
        )
        .with_table(
            MemoryTable::new(
                "tickets",
                &["id", "subject", "requester_id", "owner_id", "category_id"],
            )
            .with_rows([
                json!({"id": 1, "subject": "Printer on fire", "requester_id": 2, "owner_id": 1, "category_id": 4}),
                json!({"id": 2, "subject": "Password reset", "requester_id": 2, "owner_id": null, "category_id": null}),
                json!({"id": 3, "subject": "VPN down", "requester_id": 1, "owner_id": 1, "category_id": 4}),
            ]),
        )
        .with_table(MemoryTable::new("roles", &["id", "name", "description"]).with_rows([
            json!({"id": 1, "name": "agent", "description": "Works tickets"}),
            json!({"id": 2, "name": "admin", "description": "Manages the desk"}),
        ]))
        .with_table(MemoryTable::new("user_roles", &["user_id", "role_id"]).with_rows([
            json!({"user_id": 1, "role_id": 1}),
            json!({"user_id": 1, "role_id": 2}),
        ]))
        .with_table(
            MemoryTable::new("permissions", &["id", "name", "description"]).with_rows([
                json!({"id": 10, "name": "tickets.read", "description": null}),
                json!({"id": 11, "name": "tickets.write", "description": null}),
                json!({"id": 12, "name": "users.manage", "description": null}),
            ]),
        )
        .with_table(
            MemoryTable::new("role_permissions", &["role_id", "permission_id"]).with_rows([
                json!({"role_id": 1, "permission_id": 10}),
                json!({"role_id": 1, "permission_id": 11}),
                json!({"role_id": 2, "permission_id": 12}),
                json!({"role_id": 2, "permission_id": 10}),
            ]),
        )
}

fn list(table: &str, query: &str) -> ListQuery {
    ListQuery::new(table)
        .unwrap()
        .with_params(QueryParams::parse(query))
}

fn as_value(rows: Vec<JsonObject>) -> Value {
    Value::Array(rows.into_iter().map(Value::Object).collect())
}

#[tokio::test]
async fn orders_with_customer_names() {
    let store = Arc::new(
        MemoryDatastore::new()
            .with_table(
                MemoryTable::new("orders", &["id", "total", "customer_id"])
                    .with_row(json!({"id": 1, "total": 9.5, "customer_id": 7})),
            )
            .with_table(
                MemoryTable::new("customers", &["id", "name"])
                    .with_row(json!({"id": 7, "name": "Acme"})),
            ),
    );
    let registry = RelationRegistry::builder()
        .generic(
            RelationDecl::new("customer_id", "customers", "customer").allowed(&["id", "name"]),
        )
        .build()
        .unwrap();
    let engine = engine(&store, registry);

    let rows = engine
        .list_detailed(&list("orders", "select=orders[id,total,customer[name]]"))
        .await
        .unwrap();

    assert_eq!(
        as_value(rows),
        json!([{"id": 1, "total": 9.5, "customer": {"name": "Acme"}}])
    );
    assert_eq!(store.select_count(), 1);
}

#[tokio::test]
async fn without_selection_rows_round_trip() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine.list_detailed(&list("users", "")).await.unwrap();

    // Every base attribute is kept as stored, plus the joined department
    assert_eq!(
        as_value(rows),
        json!([
            {
                "id": 1, "name": "Ada", "email": "ada@example.com", "password_hash": "h1",
                "department_id": 1, "department": {"id": 1, "name": "Support"}
            },
            {
                "id": 2, "name": "Grace", "email": "grace@example.com", "password_hash": "h2",
                "department_id": null, "department": null
            },
        ])
    );
}

#[tokio::test]
async fn absent_target_table_is_null() {
    // `ticket_categories` doesn't exist
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("tickets", "fields=id,category_id,category"))
        .await
        .unwrap();

    assert_eq!(
        as_value(rows),
        json!([
            {"id": 1, "category_id": 4, "category": null},
            {"id": 2, "category_id": null, "category": null},
            {"id": 3, "category_id": 4, "category": null},
        ])
    );

    let Operation::Select { sql, .. } = store
        .operations()
        .into_iter()
        .find(Operation::is_select)
        .unwrap()
    else {
        unreachable!()
    };
    assert!(sql.contains(r#"NULL AS "category""#), "{sql}");
}

#[tokio::test]
async fn projected_users_are_capped() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let grace = json!({
        "id": 2, "name": "Grace", "email": "grace@example.com", "department_id": null
    });

    // Selected as a whole: every allowed attribute, never the password hash
    let rows = engine
        .list_detailed(&list("tickets", "fields=id,requester"))
        .await
        .unwrap();
    assert_eq!(rows[0]["requester"], grace);

    let rows = engine
        .list_detailed(&list("tickets", "fields=id,requester&expand=requester"))
        .await
        .unwrap();
    assert_eq!(rows[0]["requester"], grace);

    let rows = engine
        .list_detailed(&list("tickets", "fields=requester.name,requester.password_hash"))
        .await
        .unwrap();
    assert_eq!(json!(rows[0]), json!({"requester": {"name": "Grace"}}));
}

#[tokio::test]
async fn unprojected_users_are_kept_whole() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("tickets", "expand=requester"))
        .await
        .unwrap();

    assert_eq!(
        rows[0]["requester"],
        json!({
            "id": 2, "name": "Grace", "email": "grace@example.com", "password_hash": "h2",
            "department_id": null
        })
    );
}

#[tokio::test]
async fn allowed_attributes_leave_unprojected_rows_whole() {
    let store = Arc::new(
        MemoryDatastore::new()
            .with_table(
                MemoryTable::new("orders", &["id", "total", "customer_id"])
                    .with_row(json!({"id": 1, "total": 9.5, "customer_id": 7})),
            )
            .with_table(
                MemoryTable::new("customers", &["id", "name", "email"])
                    .with_row(json!({"id": 7, "name": "Acme", "email": "a@acme"})),
            ),
    );
    let registry = RelationRegistry::builder()
        .generic(
            RelationDecl::new("customer_id", "customers", "customer").allowed(&["id", "name"]),
        )
        .build()
        .unwrap();
    let engine = engine(&store, registry);

    let customer = json!({"id": 7, "name": "Acme", "email": "a@acme"});

    for query in ["", "select=orders", "expand=customer"] {
        let rows = engine.list_detailed(&list("orders", query)).await.unwrap();
        assert_eq!(
            as_value(rows),
            json!([{"id": 1, "total": 9.5, "customer_id": 7, "customer": customer}]),
            "{query}"
        );
    }

    let rows = engine
        .list_detailed(&list("orders", "fields=id,customer"))
        .await
        .unwrap();
    assert_eq!(
        as_value(rows),
        json!([{"id": 1, "customer": {"id": 7, "name": "Acme"}}])
    );
}

#[tokio::test]
async fn bracket_and_flat_selections_agree() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let bracket = engine
        .list_detailed(&list(
            "tickets",
            "select=tickets[id,owner[name,department[name]]]",
        ))
        .await
        .unwrap();
    let flat = engine
        .list_detailed(&list(
            "tickets",
            "fields=id,owner.name,owner.department.name&expand=owner.department",
        ))
        .await
        .unwrap();

    assert_eq!(bracket, flat);
    assert_eq!(
        as_value(bracket),
        json!([
            {"id": 1, "owner": {"name": "Ada", "department": {"name": "Support"}}},
            {"id": 2, "owner": null},
            {"id": 3, "owner": {"name": "Ada", "department": {"name": "Support"}}},
        ])
    );
}

#[tokio::test]
async fn nested_links_are_batched() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list(
            "tickets",
            "fields=id,owner.name,owner.roles.name,owner.roles.permissions.name&expand=owner.roles.permissions",
        ))
        .await
        .unwrap();

    let ada = json!({
        "name": "Ada",
        "roles": [
            {"name": "agent", "permissions": [{"name": "tickets.read"}, {"name": "tickets.write"}]},
            {"name": "admin", "permissions": [{"name": "tickets.read"}, {"name": "users.manage"}]},
        ]
    });
    assert_eq!(
        as_value(rows),
        json!([
            {"id": 1, "owner": ada},
            {"id": 2, "owner": null},
            {"id": 3, "owner": ada},
        ])
    );

    // The base statement, then one query per link, whatever the number of rows
    assert_eq!(store.select_count(), 3);
}

#[tokio::test]
async fn users_without_roles_get_empty_arrays() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("users", "fields=name,roles.name&expand=roles"))
        .await
        .unwrap();

    assert_eq!(
        as_value(rows),
        json!([
            {"name": "Ada", "roles": [{"name": "agent"}, {"name": "admin"}]},
            {"name": "Grace", "roles": []},
        ])
    );
}

#[tokio::test]
async fn entity_select_without_items_is_unprojected() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let unprojected = engine.list_detailed(&list("tickets", "")).await.unwrap();
    let selected = engine
        .list_detailed(&list("tickets", "select=tickets"))
        .await
        .unwrap();

    assert_eq!(selected, unprojected);
    assert_eq!(selected[0]["subject"], json!("Printer on fire"));
}

#[tokio::test]
async fn truncated_select_keeps_complete_items() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("tickets", "select=tickets[id,subject"))
        .await
        .unwrap();

    assert_eq!(
        as_value(rows),
        json!([
            {"id": 1, "subject": "Printer on fire"},
            {"id": 2, "subject": "Password reset"},
            {"id": 3, "subject": "VPN down"},
        ])
    );
}

#[tokio::test]
async fn metadata_is_looked_up_once() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());
    let query = list("tickets", "expand=owner.roles");
    let is_metadata = |operation: &Operation| !operation.is_select();

    let first = engine.list_detailed(&query).await.unwrap();
    let metadata_queries = store.count(is_metadata);
    assert!(metadata_queries > 0);

    let second = engine.list_detailed(&query).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(store.count(is_metadata), metadata_queries);
}

#[tokio::test]
async fn metadata_failures_disable_relations() {
    let store = Arc::new(helpdesk_store().failing_metadata());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("users", "expand=department,roles"))
        .await
        .unwrap();

    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|row| !row.contains_key("department")));
    assert_eq!(rows[0]["roles"], json!([]));
    assert_eq!(store.select_count(), 1);
}

#[tokio::test]
async fn unknown_sort_uses_default_ordering() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());
    let sort = SortSpec::new(&["id", "subject"], "id", Ordering::Desc).unwrap();

    let ids = |rows: Vec<JsonObject>| -> Vec<Value> {
        rows.into_iter().map(|row| row["id"].clone()).collect()
    };

    let query = list("tickets", "sort=password_hash&fields=id")
        .with_sort(sort.clone())
        .with_pagination(Pagination::new(1, 2));
    let rows = engine.list_detailed(&query).await.unwrap();
    assert_eq!(ids(rows), vec![json!(3), json!(2)]);

    // Allow-listed, in the default (descending) ordering
    let query = list("tickets", "sort=subject&fields=id")
        .with_sort(sort.clone())
        .with_pagination(Pagination::new(2, 2));
    let rows = engine.list_detailed(&query).await.unwrap();
    assert_eq!(ids(rows), vec![json!(2)]);

    let query = list("tickets", "sort=subject&order=asc&fields=id")
        .with_sort(sort)
        .with_pagination(Pagination::new(1, 2));
    let rows = engine.list_detailed(&query).await.unwrap();
    assert_eq!(ids(rows), vec![json!(2), json!(1)]);
}

#[tokio::test]
async fn relation_key_shadowed_by_column() {
    let store = Arc::new(
        helpdesk_store().with_table(
            MemoryTable::new("assets", &["id", "owner_id", "owner"])
                .with_row(json!({"id": 1, "owner_id": 1, "owner": "facilities"})),
        ),
    );
    let engine = engine(&store, helpdesk_registry().unwrap());

    let rows = engine
        .list_detailed(&list("assets", "expand=owner"))
        .await
        .unwrap();

    assert_eq!(
        as_value(rows),
        json!([{"id": 1, "owner_id": 1, "owner": "facilities"}])
    );
}

#[tokio::test]
async fn detail_by_id() {
    let store = Arc::new(helpdesk_store());
    let engine = engine(&store, helpdesk_registry().unwrap());

    let query = DetailQuery::new("tickets", "3")
        .unwrap()
        .with_params(QueryParams::parse("select=id,owner[name]"));
    let row = engine.get_detailed(&query).await.unwrap();
    assert_eq!(
        row.map(Value::Object),
        Some(json!({"id": 3, "owner": {"name": "Ada"}}))
    );

    let query = DetailQuery::new("tickets", "42").unwrap();
    assert_eq!(engine.get_detailed(&query).await.unwrap(), None);
}
