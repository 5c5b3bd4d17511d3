use crate::AdminSlug;

pub mod auth;
pub mod branding;
pub mod categories;
pub mod orders;
pub mod products;
pub mod reports;
pub mod settings;

/// Helper: get the admin base path from managed state
pub(crate) fn admin_base(slug: &AdminSlug) -> String {
    format!("/{}", slug.0)
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        auth::login,
        auth::logout,
        auth::session,
        auth::change_password,
        products::products_list,
        products::product_create,
        products::product_update,
        products::product_delete,
        products::product_toggle,
        products::product_stock,
        products::product_generate,
        categories::categories_list,
        categories::category_create,
        categories::category_delete,
        categories::category_toggle,
        orders::orders_list,
        orders::order_detail,
        orders::order_status,
        orders::order_invoice,
        reports::stats,
        reports::financial,
        reports::order_stats,
        reports::inventory,
        branding::branding_upload,
        branding::branding_data_uri,
        branding::branding_generate,
        branding::branding_delete,
        branding::branding_name,
        settings::settings_list,
        settings::settings_save,
    ]
}
