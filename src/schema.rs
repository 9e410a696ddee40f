// Mirrors the tables created by src/migrations.

diesel::table! {
    energy_data (id) {
        id -> BigInt,
        group_id -> Nullable<BigInt>,
        criteria -> Text,
        energy_method -> Text,
        direction -> Text,
        paragraph -> Nullable<Text>,
        status -> Nullable<Text>,
        #[sql_name = "user"]
        submitted_by -> Nullable<Text>,
        scale -> Nullable<Text>,
        climate -> Nullable<Text>,
        location -> Nullable<Text>,
        building_use -> Nullable<Text>,
        approach -> Nullable<Text>,
        sample_size -> Nullable<Text>,
        created_at -> Nullable<Text>,
    }
}

diesel::table! {
    users (id) {
        id -> BigInt,
        username -> Text,
        email -> Nullable<Text>,
        password -> Nullable<Text>,
        role -> Text,
        email_confirmed -> Bool,
        auth_id -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::table! {
    user_saved_analyses (id) {
        id -> BigInt,
        user_id -> BigInt,
        analysis_type -> Text,
        determinant -> Text,
        top_energy -> Nullable<Text>,
        bottom_energy -> Nullable<Text>,
        top_sorted -> Nullable<Text>,
        bottom_sorted -> Nullable<Text>,
        top_height -> Nullable<BigInt>,
        bottom_height -> Nullable<BigInt>,
        html -> Nullable<Text>,
        created_at -> Text,
    }
}

diesel::joinable!(user_saved_analyses -> users (user_id));

diesel::allow_tables_to_appear_in_same_query!(energy_data, users, user_saved_analyses,);
