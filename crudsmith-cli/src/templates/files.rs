//! Starter file templates (Handlebars)

/// Starter metadata document for `crudsmith new`
pub const METADATA_TOML: &str = r#"# {{title}} page metadata
#
# Generate the page with:
#   crudsmith generate {{entity}}.toml --target php --out ./generated
entity = "{{entity}}"
table = "{{entity}}"

[options]
with_approval = {{with_approval}}
with_trash = false
with_note = {{with_approval}}
default_order_descending = true
manual_sort_order = false
quote_identifiers = false

[[fields]]
name = "{{entity}}_id"
caption = "ID"
data_type = "int"
primary_key = true
include_in_detail = true
include_in_list = true

[[fields]]
name = "name"
caption = "Name"
data_type = "text"
required = true
include_in_insert = true
include_in_update = true
include_in_detail = true
include_in_list = true
list_filters = ["text"]

[[fields]]
name = "active"
caption = "Active"
data_type = "int"
element_type = "checkbox"
include_in_insert = true
include_in_update = true
include_in_detail = true
include_in_list = true
"#;

/// Starter configuration for `crudsmith new --with-config`
pub const CONFIG_TOML: &str = r#"# crudsmith configuration
#
# Environment variables override these values, e.g.
#   CRUDSMITH_RUNTIME__PAGE_SIZE=50

[generator]
targets = ["php"]
output_dir = "./generated"

[options]
with_approval = false
with_trash = false
with_note = false
default_order_descending = false
manual_sort_order = false
quote_identifiers = false

[runtime]
auth_include = "lib.inc/auth-with-login-form"
page_size = 20

[runtime.messages]
not_found = "Data not found"
database_failure = "Database access failed"
forbidden = "You are not allowed to perform this action"
waiting_create = "Waiting for creation approval"
waiting_update = "Waiting for update approval"
waiting_activate = "Waiting for activation approval"
waiting_deactivate = "Waiting for deactivation approval"
waiting_delete = "Waiting for delete approval"
note = "Note"
"#;
