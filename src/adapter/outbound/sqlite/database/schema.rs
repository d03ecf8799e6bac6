// Diesel schema for the market tables. Keep in sync with migrations/.

diesel::table! {
    assets (id) {
        id -> Integer,
        external_id -> Text,
        name -> Text,
        price -> Text,
        market_cap -> Text,
        volume -> Text,
        circulating_supply -> Nullable<Text>,
        total_supply -> Nullable<Text>,
        max_supply -> Nullable<Text>,
        last_updated -> Text,
    }
}

diesel::table! {
    daily_observations (id) {
        id -> Integer,
        asset_id -> Integer,
        date -> Date,
        price -> Text,
        market_cap -> Nullable<Text>,
        volume -> Nullable<Text>,
    }
}

diesel::joinable!(daily_observations -> assets (asset_id));

diesel::allow_tables_to_appear_in_same_query!(assets, daily_observations);
