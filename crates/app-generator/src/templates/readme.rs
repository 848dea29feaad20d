//! `README.md` for the counter app

pub fn render(brief: &str) -> String {
    format!(
        r#"# Auto-Generated Application

This application was automatically generated based on your request.

## Brief
{brief}

## Features
- Simple counter functionality
- Bootstrap 5 styling
- Responsive design

## How to Use
1. Open `index.html` in a web browser
2. Click the buttons to increment/decrement the counter

## Technologies Used
- HTML5
- JavaScript
- Bootstrap 5

## License
MIT License
"#
    )
}
