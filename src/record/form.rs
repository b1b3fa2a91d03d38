//! The form for logging a new expense.

use maud::{Markup, html};
use time::Date;

use crate::{
    endpoints,
    html::{BUTTON_PRIMARY_STYLE, FORM_LABEL_STYLE, FORM_TEXT_INPUT_STYLE, loading_spinner},
    record::Category,
};

/// The `id` of the category `<select>`, swapped out when a category is suggested.
pub const CATEGORY_SELECT_ID: &str = "category-select";

/// The category dropdown with `selected` chosen, or the first category if `None`.
pub fn category_select(selected: Option<Category>) -> Markup {
    let selected = selected.unwrap_or(Category::ALL[0]);

    html! {
        select
            id=(CATEGORY_SELECT_ID)
            name="category"
            class=(FORM_TEXT_INPUT_STYLE)
            required
        {
            @for category in Category::ALL {
                option value=(category.as_str()) selected[category == selected]
                {
                    (category.emoji()) " " (category.as_str())
                }
            }
        }
    }
}

/// The add-expense form, dates after `max_date` cannot be picked.
pub fn add_record_form(max_date: Date) -> Markup {
    html! {
        form
            id="add-record-form"
            hx-post=(endpoints::RECORDS_API)
            hx-target-error="#alert-container"
            hx-disabled-elt="#add-record-submit"
            class="w-full space-y-4"
        {
            div
            {
                label for="text" class=(FORM_LABEL_STYLE) { "Description" }

                input
                    type="text"
                    name="text"
                    id="text"
                    placeholder="Lunch at the cafe"
                    required
                    autofocus
                    hx-post=(endpoints::SUGGEST_CATEGORY)
                    hx-trigger="change"
                    hx-target={ "#" (CATEGORY_SELECT_ID) }
                    hx-swap="outerHTML"
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            div
            {
                label for="amount" class=(FORM_LABEL_STYLE) { "Amount" }

                div class="input-wrapper"
                {
                    input
                        type="number"
                        name="amount"
                        id="amount"
                        min="0"
                        max="1000"
                        step="0.01"
                        value="50"
                        required
                        class=(FORM_TEXT_INPUT_STYLE);
                }
            }

            div
            {
                label for=(CATEGORY_SELECT_ID) class=(FORM_LABEL_STYLE) { "Category" }
                (category_select(None))
            }

            div
            {
                label for="date" class=(FORM_LABEL_STYLE) { "Date" }

                input
                    type="date"
                    name="date"
                    id="date"
                    value=(max_date)
                    max=(max_date)
                    required
                    class=(FORM_TEXT_INPUT_STYLE);
            }

            button type="submit" id="add-record-submit" class=(BUTTON_PRIMARY_STYLE)
            {
                span class="inline htmx-indicator" { (loading_spinner()) }
                "Add expense"
            }
        }
    }
}
