pub mod autocomplete_service;
