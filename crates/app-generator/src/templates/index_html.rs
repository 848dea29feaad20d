//! `index.html` for the counter app

use super::TITLE_BRIEF_CHARS;

/// Render the page. The brief is inserted verbatim, without escaping.
pub fn render(brief: &str) -> String {
    let title_brief: String = brief.chars().take(TITLE_BRIEF_CHARS).collect();

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Demo App - {title_brief}...</title>
    <link href="https://cdn.jsdelivr.net/npm/bootstrap@5.3.0/dist/css/bootstrap.min.css" rel="stylesheet">
    <style>
        body {{ padding: 20px; background: #f8f9fa; }}
        .counter {{ font-size: 3em; font-weight: bold; color: #007bff; }}
    </style>
</head>
<body>
    <div class="container text-center">
        <h1>Demo Application</h1>
        <p class="lead">Built automatically based on your request</p>

        <div class="card shadow-sm">
            <div class="card-body">
                <h3>Counter App</h3>
                <div class="counter" id="count">0</div>
                <div class="mt-3">
                    <button class="btn btn-primary me-2" onclick="increment()">+1</button>
                    <button class="btn btn-danger" onclick="decrement()">-1</button>
                    <button class="btn btn-secondary ms-2" onclick="reset()">Reset</button>
                </div>
            </div>
        </div>

        <div class="mt-4">
            <small class="text-muted">Brief: {brief}</small>
        </div>
    </div>

    <script>
        let count = 0;
        function increment() {{
            count++;
            document.getElementById('count').textContent = count;
        }}
        function decrement() {{
            count--;
            document.getElementById('count').textContent = count;
        }}
        function reset() {{
            count = 0;
            document.getElementById('count').textContent = count;
        }}
    </script>
</body>
</html>"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_truncates_brief() {
        let brief = "A counter application with a reset button and dark mode";
        let html = render(brief);
        assert!(html.contains("<title>Demo App - A counter application with a r...</title>"));
        assert!(html.contains(&format!("Brief: {}", brief)));
    }

    #[test]
    fn test_title_handles_multibyte_brief() {
        let brief = "计数器应用程序计数器应用程序计数器应用程序计数器应用程序计数器应用程序";
        let html = render(brief);
        let expected: String = brief.chars().take(30).collect();
        assert!(html.contains(&format!("<title>Demo App - {}...</title>", expected)));
    }

    #[test]
    fn test_css_braces_render_literally() {
        let html = render("x");
        assert!(html.contains("body { padding: 20px; background: #f8f9fa; }"));
        assert!(html.contains("function reset() {"));
    }
}
