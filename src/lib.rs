pub mod shared {
    pub mod core {
        pub mod clock;
        pub mod money;
        pub mod primitives;
        pub mod week;
    }
    pub mod infrastructure {
        pub mod key_value;
        pub mod store_adapter;
    }
}

pub mod modules {
    pub mod records {
        pub mod core {
            pub mod entities;
            pub mod record;
        }
        pub mod repository;
    }
    pub mod statistics {
        pub mod core {
            pub mod scan;
            pub mod totals;
        }
        pub mod engine;
        pub mod use_cases {
            pub mod backfill {
                pub mod handler;
            }
        }
    }
    pub mod time_entries {
        pub mod use_cases {
            pub mod track_time {
                pub mod handler;
                pub mod live;
            }
        }
    }
    pub mod sync_queue {
        pub mod core {
            pub mod backoff;
            pub mod operation;
        }
        pub mod queue;
        pub mod replay;
    }
    pub mod billing {
        pub mod core {
            pub mod computed;
            pub mod draft;
            pub mod index;
        }
        pub mod snapshot;
        pub mod use_cases {
            pub mod issue_invoice {
                pub mod handler;
            }
        }
    }
    pub mod backup {
        pub mod export;
        pub mod import;
        pub mod purge;
    }
}

pub mod shell;
