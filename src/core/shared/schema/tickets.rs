diesel::table! {
    tickets (id) {
        id -> Uuid,
        #[max_length = 200]
        title -> Varchar,
        description -> Text,
        #[max_length = 20]
        category -> Varchar,
        #[max_length = 20]
        priority -> Varchar,
        #[max_length = 20]
        status -> Varchar,
        created_at -> Timestamptz,
    }
}
