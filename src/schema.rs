diesel::table! {
    papers (id) {
        id -> Integer,
        paper_id -> Text,
        title -> Text,
        abstract_text -> Text,
        categories -> Text,
        authors -> Text,
        published_date -> Nullable<Timestamp>,
        pdf_url -> Text,
        abstract_score -> Nullable<Double>,
        abstract_justification -> Nullable<Text>,
        full_score -> Nullable<Double>,
        full_justification -> Nullable<Text>,
        final_score -> Nullable<Double>,
        final_is_relevant -> Bool,
        processing_status -> Text,
        deep_analysis_status -> Text,
        deep_analysis_result -> Nullable<Text>,
        task_name -> Text,
        task_id -> Text,
        metadata -> Text,
        kb_export_status -> Nullable<Text>,
        kb_export_id -> Nullable<Text>,
        created_at -> Timestamp,
        updated_at -> Timestamp,
        analyzed_at -> Nullable<Timestamp>,
    }
}

diesel::table! {
    scheduled_run_locks (task_id) {
        task_id -> Text,
        run_id -> Text,
        started_at -> Timestamp,
    }
}

diesel::table! {
    global_settings (id) {
        id -> Integer,
        data -> Text,
        updated_at -> Timestamp,
    }
}
