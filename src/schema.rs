diesel::table! {
    attendance_record (userid, date, subject) {
        userid -> Text,
        date -> Date,
        subject -> Text,
        status -> Text,
        swapped_to -> Nullable<Text>,
    }
}

diesel::table! {
    calendar (id) {
        id -> Integer,
        date -> Date,
        name -> Text,
        #[sql_name = "type"]
        kind -> Text,
        is_institution_wide -> Bool,
        userid -> Nullable<Text>,
    }
}

diesel::table! {
    profiles (id) {
        id -> Text,
        name -> Text,
        email -> Text,
        branch -> Text,
        batch -> Text,
        roll_number -> Text,
    }
}

diesel::table! {
    sessions (token) {
        token -> Text,
        userid -> Text,
        created_at -> Timestamp,
    }
}

diesel::table! {
    timetable (id) {
        id -> Integer,
        subject -> Text,
        start_time -> Time,
        end_time -> Time,
        room -> Nullable<Text>,
        day -> Text,
        batch -> Text,
        is_batch_wide -> Bool,
    }
}

diesel::table! {
    user_roles (userid, role) {
        userid -> Text,
        role -> Text,
    }
}

diesel::table! {
    users (id) {
        id -> Text,
        email -> Text,
        password_hash -> Text,
        salt -> Text,
        iterations -> Integer,
        created_at -> Timestamp,
    }
}

diesel::joinable!(attendance_record -> profiles (userid));
diesel::joinable!(profiles -> users (id));
diesel::joinable!(sessions -> users (userid));
diesel::joinable!(user_roles -> users (userid));

diesel::allow_tables_to_appear_in_same_query!(
    attendance_record,
    calendar,
    profiles,
    sessions,
    timetable,
    user_roles,
    users,
);
