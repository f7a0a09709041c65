diesel::table! {
    organizations (id) {
        id -> Text,
        name -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    profiles (id) {
        id -> Text,
        org_id -> Text,
        full_name -> Text,
        role -> Text,
        phone -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    sites (id) {
        id -> Text,
        org_id -> Text,
        name -> Text,
        code -> Text,
        location -> Nullable<Text>,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    tenants (id) {
        id -> Text,
        org_id -> Text,
        site_id -> Text,
        block_id -> Nullable<Text>,
        name -> Text,
        phone -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    requesters (id) {
        id -> Text,
        org_id -> Text,
        phone -> Text,
        status -> Text,
        created_at -> Timestamptz,
    }
}

diesel::table! {
    service_requests (id) {
        id -> Text,
        org_id -> Text,
        site_id -> Nullable<Text>,
        block_id -> Nullable<Text>,
        asset_id -> Nullable<Text>,
        title -> Text,
        description -> Text,
        requester_phone -> Text,
        status -> Text,
        source -> Text,
        resolution_notes -> Nullable<Text>,
        created_at -> Timestamptz,
    }
}

diesel::joinable!(profiles -> organizations (org_id));
diesel::joinable!(sites -> organizations (org_id));
diesel::joinable!(tenants -> organizations (org_id));
diesel::joinable!(requesters -> organizations (org_id));
diesel::joinable!(service_requests -> organizations (org_id));

diesel::allow_tables_to_appear_in_same_query!(
    organizations,
    profiles,
    sites,
    tenants,
    requesters,
    service_requests,
);
