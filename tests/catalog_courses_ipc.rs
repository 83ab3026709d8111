mod test_support;

use serde_json::json;
use test_support::{request_ok, spawn_sidecar, temp_dir, Route, StubServer};

fn sample_course() -> serde_json::Value {
    json!({
        "id": "c1",
        "title": "Fractions",
        "description": "Working with fractions",
        "subject": "math",
        "grade": 6,
        "level": "beginner",
        "duration": 0,
        "units": [
            {
                "id": "u1",
                "title": "Basics",
                "lessons": [
                    { "id": "l1", "title": "Halves", "duration": 15 },
                    { "id": "l2", "title": "Thirds", "duration": 30 },
                    { "id": "l3", "title": "Quarters", "duration": 45 }
                ]
            }
        ]
    })
}

#[test]
fn course_list_passes_filters_and_derives_duration() {
    let server = StubServer::start(vec![Route {
        method: "GET",
        path: "/courses",
        status: 200,
        body: json!({ "success": true, "courses": [sample_course()] }),
    }]);
    let workspace = temp_dir("learnhub-catalog-list");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backend.connect",
        json!({ "baseUrl": server.base_url }),
    );

    let result = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.list",
        json!({ "subject": "math", "grade": 6, "level": "beginner", "search": "fractions" }),
    );
    let course = &result["courses"][0];
    assert_eq!(course.pointer("/computed/totalLessons").and_then(|v| v.as_i64()), Some(3));
    assert_eq!(
        course.pointer("/computed/totalDurationMinutes").and_then(|v| v.as_i64()),
        Some(90)
    );
    assert_eq!(
        course.pointer("/computed/durationDisplay").and_then(|v| v.as_str()),
        Some("1 hr 30 min")
    );

    let records = server.records();
    let target = &records[0].target;
    assert!(target.starts_with("/courses?"), "unexpected target {}", target);
    for param in ["subject=math", "grade=6", "level=beginner", "search=fractions"] {
        assert!(target.contains(param), "{} missing from {}", param, target);
    }
}

#[test]
fn course_open_caches_and_falls_back_when_offline() {
    let server = StubServer::start(vec![Route {
        method: "GET",
        path: "/courses/c1",
        status: 200,
        body: json!({ "success": true, "course": sample_course() }),
    }]);
    let workspace = temp_dir("learnhub-catalog-cache");
    let (_child, mut stdin, mut reader) = spawn_sidecar();

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "2",
        "backend.connect",
        json!({ "baseUrl": server.base_url }),
    );

    let live = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "courses.open",
        json!({ "courseId": "c1" }),
    );
    assert_eq!(live.get("fromCache").and_then(|v| v.as_bool()), Some(false));
    assert_eq!(
        live.pointer("/course/title").and_then(|v| v.as_str()),
        Some("Fractions")
    );

    // Point the client at a dead port; the cached copy still answers.
    let dead_url = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        format!("http://{}", listener.local_addr().expect("addr"))
    };
    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "backend.connect",
        json!({ "baseUrl": dead_url }),
    );
    let cached = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "courses.open",
        json!({ "courseId": "c1" }),
    );
    assert_eq!(cached.get("fromCache").and_then(|v| v.as_bool()), Some(true));
    assert_eq!(
        cached.pointer("/course/computed/totalDurationMinutes").and_then(|v| v.as_i64()),
        Some(90)
    );
    assert!(cached.get("fetchedAt").and_then(|v| v.as_str()).is_some());
}
