//! Built-in form specs for the hotel booking application

use staycheck_engine::{EngineResult, FormSpec};

pub const CONTACT_FORM: &str = include_str!("../forms/contact.yaml");
pub const ROOM_FORM: &str = include_str!("../forms/room.yaml");

/// Role whose credentials the admin pages need
pub const ADMIN_ROLE: &str = "admin";

pub fn contact_form() -> EngineResult<FormSpec> {
    FormSpec::from_yaml(CONTACT_FORM)
}

pub fn room_form() -> EngineResult<FormSpec> {
    FormSpec::from_yaml(ROOM_FORM)
}

/// Every built-in form, in run order
pub fn hotel_forms() -> EngineResult<Vec<FormSpec>> {
    Ok(vec![contact_form()?, room_form()?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use staycheck_engine::form::{InputKind, PayloadMatch};

    #[test]
    fn test_contact_form() {
        let form = contact_form().unwrap();
        assert_eq!(form.fields.len(), 5);
        assert_eq!(form.field("fullName").unwrap().api_key(), "name");
        assert_eq!(form.omission_set().len(), 5);
        assert_eq!(form.success.payload, PayloadMatch::Exact);
        assert!(form.auth.is_none());
        assert!(form.listing.is_none());
    }

    #[test]
    fn test_room_form() {
        let form = room_form().unwrap();
        assert_eq!(form.path, "/#/admin");
        assert_eq!(form.auth.as_ref().unwrap().role, ADMIN_ROLE);
        assert_eq!(form.omission_set(), vec!["number", "price"]);
        assert_eq!(form.field("features").unwrap().input, InputKind::Check);
        assert_eq!(form.field("price").unwrap().api_key(), "roomPrice");

        let listing = form.listing.as_ref().unwrap();
        assert_eq!(listing.route.alias, "getRooms");
        assert_eq!(listing.items_key.as_deref(), Some("rooms"));
        assert!(listing.detail.as_ref().unwrap().refetch);
    }

    #[test]
    fn test_forms_have_unique_names() {
        let forms = hotel_forms().unwrap();
        let names: Vec<&str> = forms.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["contact", "room"]);
    }
}
