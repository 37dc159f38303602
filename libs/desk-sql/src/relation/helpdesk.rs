// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{LinkDecl, RelationDecl, RegistryError, RelationRegistry};

const USER_ATTRIBUTES: &[&str] = &["id", "name", "email", "department_id", "is_active"];
const USER_DEFAULTS: &[&str] = &["id", "name"];
const LOOKUP_ATTRIBUTES: &[&str] = &["id", "name"];

/// The relation graph of the helpdesk schema.
///
/// Projected rows never expose users with their credentials, whichever relation reaches them.
pub fn helpdesk_registry() -> Result<RelationRegistry, RegistryError> {
    let user = |column: &str, key: &str| {
        RelationDecl::new(column, "users", key)
            .allowed(USER_ATTRIBUTES)
            .defaults(USER_DEFAULTS)
    };

    RelationRegistry::builder()
        .generic(user("requester_id", "requester"))
        .generic(user("assigned_agent_id", "assigned_agent"))
        .generic(user("owner_id", "owner"))
        .generic(user("author_id", "author"))
        .generic(user("sender_id", "sender"))
        .generic(user("created_by", "creator"))
        .generic(user("updated_by", "updater"))
        .generic(
            RelationDecl::new("status_id", "ticket_statuses", "status")
                .allowed(&["id", "name", "is_closed"])
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .generic(
            RelationDecl::new("priority_id", "ticket_priorities", "priority")
                .allowed(&["id", "name", "level"])
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .generic(
            RelationDecl::new("category_id", "ticket_categories", "category")
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .generic(
            RelationDecl::new("department_id", "departments", "department")
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .generic(
            RelationDecl::new("organization_id", "organizations", "organization")
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .generic(
            RelationDecl::new("ticket_id", "tickets", "ticket")
                .defaults(&["id", "subject", "status_id"]),
        )
        .specific(
            "kb_articles",
            RelationDecl::new("category_id", "kb_categories", "category")
                .defaults(LOOKUP_ATTRIBUTES),
        )
        .link(
            LinkDecl::new("users", "roles", "roles")
                .via("user_roles", "user_id", "role_id")
                .allowed(&["id", "name", "description"]),
        )
        .link(
            LinkDecl::new("roles", "permissions", "permissions")
                .via("role_permissions", "role_id", "permission_id")
                .allowed(&["id", "name", "description"]),
        )
        .build()
}
