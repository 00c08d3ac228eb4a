use iron::prelude::*;
use iron::{headers, method, status, BeforeMiddleware};
use iron_csrf_guard::{Csrf, CsrfToken, FormFields};

use std::collections::HashMap;
use std::io::Read;

fn main() {
    env_logger::init();

    let mut chain = Chain::new(route);
    chain.link_before(ParseForm);
    chain.link_around(Csrf::new());

    // Make and start the server
    Iron::new(chain).http("localhost:8080").unwrap();
}

/// Makes urlencoded POST bodies available to the CSRF middleware.
struct ParseForm;

impl BeforeMiddleware for ParseForm {
    fn before(&self, req: &mut Request) -> IronResult<()> {
        if req.method != method::Post {
            return Ok(());
        }

        let mut body = String::new();
        if req.body.read_to_string(&mut body).is_err() {
            return Ok(());
        }

        if let Ok(fields) = serde_urlencoded::from_str::<HashMap<String, String>>(&body) {
            req.extensions.insert::<FormFields>(fields);
        }

        Ok(())
    }
}

fn route(request: &mut Request) -> IronResult<Response> {
    let token = request.extensions.get::<CsrfToken>().unwrap();

    let msg = if request.method == method::Post {
        "Posted!".to_owned()
    } else {
        format!(
            r#"<form method="post">
<input type="hidden" name="csrftoken" value="{}">
<button>Submit</button>
</form>"#,
            token
        )
    };

    let mut response = Response::with((status::Ok, msg));
    response.headers.set(headers::ContentType::html());
    Ok(response)
}
